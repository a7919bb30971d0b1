//! Base export document built from the user's profile

use crate::adapters::catalog::CatalogUser;
use crate::domain::document::{relativize_url_field, BOOKS_KEY};
use crate::domain::{Result, ShelfpackError, SocialSection};
use serde_json::{json, Value};

/// The user's serialized identity with a relative avatar path, the account
/// settings, and an empty list under every key a child job fills in later.
pub fn base_document(user: &CatalogUser) -> Result<Value> {
    let mut document = user.activity.clone();
    let fields = document.as_object_mut().ok_or_else(|| {
        ShelfpackError::Validation(format!("Serialized user {} is not a JSON object", user.id))
    })?;

    let icon = match fields.get("icon") {
        Some(icon) if icon.as_object().is_some_and(|o| !o.is_empty()) => {
            let mut icon = icon.clone();
            relativize_url_field(&mut icon, "url");
            icon
        }
        _ => json!({}),
    };
    fields.insert("icon".to_string(), icon);
    fields.insert("settings".to_string(), serde_json::to_value(&user.settings)?);

    fields.insert(BOOKS_KEY.to_string(), json!([]));
    for section in SocialSection::ALL {
        fields.insert(section.document_key().to_string(), json!([]));
    }

    Ok(document)
}
