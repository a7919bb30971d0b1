//! Storage abstraction layer
//!
//! One interface over the local filesystem and S3-compatible object storage.
//! The backend is chosen once per process from `storage.backend`.

pub mod archive;
pub mod factory;
pub mod local;
pub mod remote;
pub mod traits;

pub use factory::create_storage;
pub use local::LocalStorage;
pub use remote::RemoteStorage;
pub use traits::{ArchiveEntry, EntrySource, StorageAdapter};
