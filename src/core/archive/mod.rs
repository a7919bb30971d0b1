//! Archive assembly

pub mod builder;

pub use builder::{archive_key, staging_key, ArchiveBuilder};
