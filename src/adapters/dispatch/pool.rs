//! Bounded tokio worker pool
//!
//! [`WorkerPool`] is the sending side: it hands tasks to an unbounded `mpsc`
//! channel. [`WorkerQueue`] is the receiving side: it runs each task on its own
//! tokio task, at most `workers.concurrency` at once, until shutdown is
//! signalled.
//!
//! Running tasks enqueue follow-up work while holding a permit, so `enqueue`
//! never waits on queue space. Backpressure is the semaphore alone.

use super::traits::{Task, TaskDispatcher, TaskHandler};
use crate::config::WorkerConfig;
use crate::domain::{Result, ShelfpackError, TaskHandle};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

#[derive(Debug)]
struct QueuedTask {
    task: Task,
    handle: TaskHandle,
}

/// Dispatcher half of the worker pool
#[derive(Clone)]
pub struct WorkerPool {
    queue_name: String,
    sender: mpsc::UnboundedSender<QueuedTask>,
}

impl WorkerPool {
    /// Create a pool and the queue that will execute its tasks
    pub fn new(config: &WorkerConfig) -> (Self, WorkerQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pool = Self {
            queue_name: config.queue_name.clone(),
            sender,
        };
        let queue = WorkerQueue {
            receiver,
            concurrency: config.concurrency.max(1),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        };
        (pool, queue)
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl TaskDispatcher for WorkerPool {
    async fn enqueue(&self, task: Task, queue: &str) -> Result<TaskHandle> {
        if queue != self.queue_name {
            return Err(ShelfpackError::Dispatch(format!(
                "Unknown queue '{queue}', this pool serves '{}'",
                self.queue_name
            )));
        }

        let handle = TaskHandle::generate();
        self.sender
            .send(QueuedTask {
                task,
                handle: handle.clone(),
            })
            .map_err(|_| ShelfpackError::Dispatch("Worker queue is closed".to_string()))?;

        crate::log_task_dispatched!(task.name(), queue, handle);
        Ok(handle)
    }
}

/// Executing half of the worker pool
pub struct WorkerQueue {
    receiver: mpsc::UnboundedReceiver<QueuedTask>,
    concurrency: usize,
    shutdown_timeout: Duration,
}

impl WorkerQueue {
    /// Start executing tasks on the current runtime.
    ///
    /// The returned future finishes once `shutdown` turns `true` (or every
    /// [`WorkerPool`] clone is dropped) and in-flight tasks have drained or the
    /// shutdown timeout expired. Dropping the shutdown sender does not stop
    /// the queue.
    pub fn spawn(
        self,
        handler: Arc<dyn TaskHandler>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(handler, shutdown))
    }

    async fn run(mut self, handler: Arc<dyn TaskHandler>, mut shutdown: watch::Receiver<bool>) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        tracing::info!(concurrency = self.concurrency, "Worker queue started");

        loop {
            while let Some(result) = join_set.try_join_next() {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Task panicked");
                }
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                permit = Arc::clone(&semaphore).acquire_owned() => permit,
            };
            let Ok(permit) = permit else { break };

            let queued = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                queued = self.receiver.recv() => queued,
            };
            let Some(QueuedTask { task, handle }) = queued else {
                tracing::debug!("All dispatchers dropped, worker queue draining");
                break;
            };

            let handler = Arc::clone(&handler);
            let span = crate::logging::job_span(task.name(), task.job_id(), &handle);
            join_set.spawn(
                async move {
                    let _permit = permit;
                    if let Err(e) = handler.handle(task, handle).await {
                        crate::log_error_with_context!(e, task.name());
                    }
                }
                .instrument(span),
            );
        }

        self.receiver.close();
        let in_flight = join_set.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for running tasks");
        }

        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while let Some(result) = join_set.join_next().await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Task panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = join_set.len(),
                "Shutdown timeout reached, aborting running tasks"
            );
            join_set.abort_all();
        }

        tracing::info!("Worker queue stopped");
    }
}

/// Resolves once the shutdown flag is set; never resolves if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
