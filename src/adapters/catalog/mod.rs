//! Host application catalog
//!
//! Read-only access to users, editions and the things users attached to them.
//! [`HttpCatalog`] talks to the host application's JSON API.

pub mod http;
pub mod models;
pub mod traits;

pub use http::HttpCatalog;
pub use models::{
    BookStatuses, CatalogEdition, CatalogUser, Comment, ListMembership, Quotation, ReadingGoal,
    UserSettings,
};
pub use traits::Catalog;
