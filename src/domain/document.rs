//! Export document helpers
//!
//! The export document is plain JSON. These helpers cover the two things the
//! pipeline needs to know about its shape: turning absolute media URLs into
//! archive-relative paths, and finding the images the archive must carry.

use percent_encoding::percent_decode_str;
use serde_json::Value;
use url::Url;

/// Top-level key holding one entry per exported edition
pub const BOOKS_KEY: &str = "books";

/// Name of the JSON entry inside every archive
pub const ARCHIVE_JSON_NAME: &str = "archive.json";

/// Prefix under which images are stored and archived
pub const IMAGES_PREFIX: &str = "images/";

/// Converts a media URL into a path relative to the media root.
///
/// The leading `/` of the URL path is dropped and percent escapes are decoded,
/// so `https://example.com/images/covers/a%20b.jpg` becomes
/// `images/covers/a b.jpg`. Query strings and fragments are discarded.
/// Returns `None` when nothing is left.
pub fn relative_media_path(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let trimmed = path.strip_prefix('/').unwrap_or(&path);
    let decoded = percent_decode_str(trimmed).decode_utf8_lossy();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}

/// Rewrites `value[field]` in place from an absolute URL to a relative path.
///
/// Leaves the value untouched when the field is missing or not a string.
pub fn relativize_url_field(value: &mut Value, field: &str) {
    if let Some(slot) = value.get_mut(field) {
        if let Some(url) = slot.as_str() {
            match relative_media_path(url) {
                Some(path) => *slot = Value::String(path),
                None => *slot = Value::Null,
            }
        }
    }
}

/// Image paths referenced by the document, avatar first, then covers in
/// `books` order, without duplicates.
pub fn image_references(document: &Value) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    let mut push = |candidate: Option<&str>| {
        if let Some(path) = candidate.filter(|p| !p.is_empty()) {
            if !refs.iter().any(|r| r == path) {
                refs.push(path.to_string());
            }
        }
    };

    push(document.pointer("/icon/url").and_then(Value::as_str));

    if let Some(books) = document.get(BOOKS_KEY).and_then(Value::as_array) {
        for book in books {
            push(book.pointer("/edition/cover/url").and_then(Value::as_str));
        }
    }

    refs
}
