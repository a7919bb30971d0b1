//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod cancel;
pub mod export;
pub mod init;
pub mod status;
pub mod validate;
