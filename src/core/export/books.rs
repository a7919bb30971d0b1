//! Per-edition book entries
//!
//! One entry is appended to the document's `books` list for every edition the
//! user interacted with.

use crate::adapters::catalog::Catalog;
use crate::domain::document::relativize_url_field;
use crate::domain::{EditionId, Result, ShelfpackError, UserId};
use serde_json::{json, Map, Value};

/// Everything the user attached to one edition, ready to append to `books`
pub async fn book_entry(
    catalog: &dyn Catalog,
    user: &UserId,
    edition_id: &EditionId,
) -> Result<Value> {
    let (edition, shelves, memberships, statuses, readthroughs) = tokio::try_join!(
        catalog.edition(edition_id),
        catalog.shelves_for(user, edition_id),
        catalog.list_memberships_for(user, edition_id),
        catalog.statuses_for(user, edition_id),
        catalog.readthroughs_for(user, edition_id),
    )?;

    let mut edition_activity = edition.edition;
    if let Some(cover) = edition_activity
        .get_mut("cover")
        .filter(|cover| cover.is_object())
    {
        relativize_url_field(cover, "url");
    }

    let lists = memberships
        .into_iter()
        .map(|m| {
            extend_activity(
                m.list,
                [("privacy", Value::String(m.privacy)), ("list_item", m.list_item)],
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let comments = statuses
        .comments
        .into_iter()
        .map(|c| {
            extend_activity(
                c.activity,
                [
                    ("progress", json!(c.progress)),
                    ("progress_mode", json!(c.progress_mode)),
                ],
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let quotations = statuses
        .quotations
        .into_iter()
        .map(|q| {
            extend_activity(
                q.activity,
                [
                    ("position", json!(q.position)),
                    ("endposition", json!(q.endposition)),
                    ("position_mode", json!(q.position_mode)),
                ],
            )
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "work": edition.work,
        "edition": edition_activity,
        "authors": edition.authors,
        "shelves": shelves,
        "lists": lists,
        "comments": comments,
        "quotations": quotations,
        "reviews": statuses.reviews,
        "readthroughs": readthroughs,
    }))
}

/// Adds fields the serialized activity does not carry
fn extend_activity<const N: usize>(activity: Value, extra: [(&str, Value); N]) -> Result<Value> {
    let mut fields: Map<String, Value> = match activity {
        Value::Object(fields) => fields,
        other => {
            return Err(ShelfpackError::Validation(format!(
                "Expected a serialized activity object, got {other}"
            )))
        }
    };
    for (key, value) in extra {
        fields.insert(key.to_string(), value);
    }
    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_activity() {
        let extended = extend_activity(
            json!({"type": "Comment", "content": "good"}),
            [("progress", json!(42)), ("progress_mode", json!("PG"))],
        )
        .unwrap();
        assert_eq!(extended["progress"], 42);
        assert_eq!(extended["progress_mode"], "PG");
        assert_eq!(extended["content"], "good");
    }

    #[test]
    fn test_extend_non_object_fails() {
        assert!(extend_activity(json!([1, 2]), [("privacy", json!("public"))]).is_err());
    }
}
