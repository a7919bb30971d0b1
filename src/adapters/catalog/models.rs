//! Catalog response models
//!
//! Activity payloads (`activity`, `work`, `edition`, ...) are the host
//! application's serialized federation objects. They are carried through to
//! the export document untouched, so they stay as [`serde_json::Value`].

use crate::domain::{EditionId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user account as the catalog serializes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogUser {
    pub id: UserId,
    /// Serialized actor; becomes the base of the export document
    pub activity: Value,
    pub settings: UserSettings,
}

/// Account settings that are not part of the serialized actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub show_goal: bool,
    pub preferred_timezone: String,
    pub default_post_privacy: String,
    pub show_suggested_users: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            show_goal: true,
            preferred_timezone: "UTC".to_string(),
            default_post_privacy: "public".to_string(),
            show_suggested_users: true,
        }
    }
}

/// One edition with its parent work and authors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEdition {
    pub id: EditionId,
    pub work: Value,
    pub edition: Value,
    #[serde(default)]
    pub authors: Vec<Value>,
}

/// A list the user added an edition to, with the item that links them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMembership {
    pub list: Value,
    pub privacy: String,
    pub list_item: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub activity: Value,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub progress_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub activity: Value,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub endposition: Option<i64>,
    #[serde(default)]
    pub position_mode: Option<String>,
}

/// Statuses a user posted about one edition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookStatuses {
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub quotations: Vec<Quotation>,
    #[serde(default)]
    pub reviews: Vec<Value>,
}

/// Annual reading goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingGoal {
    pub goal: u32,
    pub year: i32,
    pub privacy: String,
}
