//! Wiring shared by the CLI commands
//!
//! Builds the job store, storage backend, catalog client and worker pool
//! from a loaded configuration.

use crate::adapters::catalog::HttpCatalog;
use crate::adapters::dispatch::{TaskHandler, WorkerPool, WorkerQueue};
use crate::adapters::jobstore::create_job_store;
use crate::adapters::storage::create_storage;
use crate::config::ShelfpackConfig;
use crate::core::export::ExportCoordinator;
use crate::core::jobs::JobManager;
use crate::domain::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Open the configured job store and check that it is reachable
pub async fn open_jobs(config: &ShelfpackConfig) -> Result<JobManager> {
    let store = create_job_store(config).await?;
    store.test_connection().await?;
    Ok(JobManager::new_with_store(store))
}

/// Coordinator plus the in-process worker pool that runs its tasks
pub struct ExportRuntime {
    pub coordinator: Arc<ExportCoordinator>,
    pub pool: WorkerPool,
    queue: WorkerQueue,
}

impl ExportRuntime {
    /// Build every adapter named in `config`
    ///
    /// # Errors
    ///
    /// Configuration errors for bad storage or catalog settings, connection
    /// errors when the job store cannot be reached.
    pub async fn build(config: &ShelfpackConfig) -> Result<Self> {
        let store = create_job_store(config).await?;
        store.test_connection().await?;

        let storage = create_storage(&config.storage)?;
        let catalog = Arc::new(HttpCatalog::new(config.catalog.clone())?);
        let (pool, queue) = WorkerPool::new(&config.workers);

        let coordinator = Arc::new(ExportCoordinator::new(
            store,
            catalog,
            storage,
            Arc::new(pool.clone()),
            pool.queue_name(),
        ));

        tracing::info!(
            database_target = ?config.database_target,
            storage_backend = ?config.storage.backend,
            concurrency = config.workers.concurrency,
            queue = pool.queue_name(),
            "Export runtime ready"
        );

        Ok(Self {
            coordinator,
            pool,
            queue,
        })
    }

    /// Start the workers; they run until `shutdown` flips to true
    pub fn spawn_workers(
        self,
        shutdown: watch::Receiver<bool>,
    ) -> (Arc<ExportCoordinator>, WorkerPool, JoinHandle<()>) {
        let handler: Arc<dyn TaskHandler> = self.coordinator.clone();
        let workers = self.queue.spawn(handler, shutdown);
        (self.coordinator, self.pool, workers)
    }
}
