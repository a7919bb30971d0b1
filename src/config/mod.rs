//! Configuration management for Shelfpack.
//!
//! Shelfpack reads a single TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `SHELFPACK_<SECTION>_<KEY>` overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//! database_target = "postgresql"
//!
//! [storage]
//! backend = "s3"
//!
//! [storage.s3]
//! bucket = "account-exports"
//! region = "eu-west-1"
//! access_key_id = "${SHELFPACK_S3_KEY_ID}"
//! secret_access_key = "${SHELFPACK_S3_SECRET}"
//!
//! [postgresql]
//! connection_string = "${SHELFPACK_DATABASE_URL}"
//!
//! [catalog]
//! base_url = "https://books.example/api"
//! auth_type = "bearer"
//! api_token = "${SHELFPACK_CATALOG_TOKEN}"
//!
//! [workers]
//! concurrency = 16
//! queue_name = "imports"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_str};
pub use schema::{
    ApplicationConfig, CatalogConfig, DatabaseTarget, Environment, LocalStorageConfig,
    LoggingConfig, PostgreSQLConfig, RetryConfig, S3StorageConfig, ShelfpackConfig,
    StorageBackend, StorageConfig, WorkerConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
