//! Logging and observability
//!
//! Structured logging with:
//! - JSON-formatted file logs with rotation
//! - Console output
//! - Helper macros that keep field names consistent across the pipeline
//!
//! # Example
//!
//! ```no_run
//! use shelfpack::logging::init_logging;
//! use shelfpack::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Worker pool started");
//! ```

pub mod structured;

pub use structured::{init_logging, job_span, LoggingGuard, JOB_SPAN_NAME};

/// Log a job status transition
///
/// # Example
///
/// ```
/// use shelfpack::log_job_transition;
/// use shelfpack::domain::{JobId, JobStatus};
///
/// let id = JobId::new();
/// log_job_transition!(id, JobStatus::Active);
/// log_job_transition!(id, JobStatus::Complete, "build_archive");
/// ```
#[macro_export]
macro_rules! log_job_transition {
    ($job_id:expr, $status:expr) => {
        tracing::info!(
            job_id = %$job_id,
            status = %$status,
            "Job status changed"
        );
    };
    ($job_id:expr, $status:expr, $kind:expr) => {
        tracing::info!(
            job_id = %$job_id,
            status = %$status,
            kind = $kind,
            "Job status changed"
        );
    };
}

/// Log a task handed to the dispatcher
///
/// # Example
///
/// ```
/// use shelfpack::log_task_dispatched;
///
/// log_task_dispatched!("run_child", "imports", "7f1c");
/// ```
#[macro_export]
macro_rules! log_task_dispatched {
    ($task_name:expr, $queue:expr, $handle:expr) => {
        tracing::debug!(
            task = $task_name,
            queue = $queue,
            task_handle = %$handle,
            "Task enqueued"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```
/// use shelfpack::log_error_with_context;
/// use shelfpack::domain::ShelfpackError;
///
/// let error = ShelfpackError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```
/// use shelfpack::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
