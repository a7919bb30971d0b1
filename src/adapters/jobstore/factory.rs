//! Job store factory

use crate::adapters::jobstore::memory::InMemoryJobStore;
use crate::adapters::jobstore::traits::JobStore;
use crate::adapters::postgresql::{PostgreSQLClient, PostgresJobStore};
use crate::config::schema::{DatabaseTarget, ShelfpackConfig};
use crate::domain::{Result, ShelfpackError};
use std::sync::Arc;

/// Create the job store selected by `database_target`
///
/// The PostgreSQL store applies the schema migration before it is returned.
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing or the database
/// cannot be reached.
pub async fn create_job_store(config: &ShelfpackConfig) -> Result<Arc<dyn JobStore>> {
    match config.database_target {
        DatabaseTarget::Memory => {
            tracing::info!("Creating in-memory job store");
            Ok(Arc::new(InMemoryJobStore::new()))
        }
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                ShelfpackError::Configuration(
                    "PostgreSQL configuration is required when database_target is 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL job store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            client.ensure_schema().await?;

            Ok(Arc::new(PostgresJobStore::new(client)))
        }
    }
}
