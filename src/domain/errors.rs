//! Domain error types
//!
//! This module defines the error hierarchy for Shelfpack. Adapter-specific
//! failures are folded into [`StorageError`] and [`CatalogError`] so that no
//! third-party error type leaks across the crate boundary.

use thiserror::Error;

/// Main Shelfpack error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum ShelfpackError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Job store errors
    #[error("Database error: {0}")]
    Database(String),

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Catalog (host application) errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Task dispatch errors
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// A job id that the store does not know about
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Archive assembly errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Storage adapter errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The named blob does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Key escapes the storage root or is otherwise malformed
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Operation not offered by this backend
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Any other backend failure
    #[error("Backend failure: {0}")]
    Backend(String),
}

/// Catalog-specific errors
///
/// Errors that occur when reading users and books from the host application.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to connect to the catalog
    #[error("Failed to connect to catalog: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Requested user or edition is unknown
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid response from server
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl CatalogError {
    /// Whether retrying the request could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::ConnectionFailed(_)
                | CatalogError::Timeout(_)
                | CatalogError::ServerError { .. }
        )
    }
}

impl ShelfpackError {
    /// Process exit code for this error when it aborts a CLI command
    pub fn exit_code(&self) -> i32 {
        match self {
            ShelfpackError::Configuration(_) => 2,
            ShelfpackError::Connection(_) | ShelfpackError::Database(_) => 4,
            ShelfpackError::Catalog(CatalogError::ConnectionFailed(_)) => 4,
            _ => 1,
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for ShelfpackError {
    fn from(err: std::io::Error) -> Self {
        ShelfpackError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ShelfpackError {
    fn from(err: serde_json::Error) -> Self {
        ShelfpackError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ShelfpackError {
    fn from(err: toml::de::Error) -> Self {
        ShelfpackError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
            other => StorageError::Backend(other.to_string()),
        }
    }
}

impl From<object_store::Error> for ShelfpackError {
    fn from(err: object_store::Error) -> Self {
        ShelfpackError::Storage(err.into())
    }
}
