//! Social graph snapshots
//!
//! Each section is written by its own child job into its own document key.

use crate::adapters::catalog::Catalog;
use crate::domain::{Result, SocialSection, UserId};
use serde_json::Value;

/// Value stored under `section.document_key()`
pub async fn snapshot_section(
    catalog: &dyn Catalog,
    user: &UserId,
    section: SocialSection,
) -> Result<Value> {
    let value = match section {
        SocialSection::SavedLists => serde_json::to_value(catalog.saved_lists(user).await?)?,
        SocialSection::Follows => serde_json::to_value(catalog.follows(user).await?)?,
        SocialSection::Blocks => serde_json::to_value(catalog.blocks(user).await?)?,
        SocialSection::Goals => serde_json::to_value(catalog.reading_goals(user).await?)?,
    };
    Ok(value)
}
