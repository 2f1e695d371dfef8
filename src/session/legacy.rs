//! Conversion from the flat store layout written by earlier releases.
//!
//! That layout kept one top-level key per file path holding its offset, next
//! to reserved keys for the shelf, bookmarks, last title and preferences.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::document::{
    Bookmark, DEFAULT_BUTTON_FONT_SIZE, DEFAULT_TITLE_FONT_SIZE, DEFAULT_VOLUME, SessionDocument,
    UiSettings,
};

const SHELF_KEY: &str = "__bookshelf__";
const BOOKMARKS_KEY: &str = "__bookmarks__";
const LAST_TITLE_KEY: &str = "__last_book__";
const BUTTON_FONT_KEY: &str = "ui_btn_size";
const TITLE_FONT_KEY: &str = "ui_title_size";
const VOLUME_KEY: &str = "volume";

const LEGACY_MARKERS: [&str; 5] = [
    SHELF_KEY,
    BOOKMARKS_KEY,
    LAST_TITLE_KEY,
    BUTTON_FONT_KEY,
    TITLE_FONT_KEY,
];

#[derive(Deserialize)]
struct LegacyBookmark {
    file: PathBuf,
    pos: i64,
    #[serde(default)]
    note: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// True when `object` uses the flat layout instead of the current one.
pub(super) fn is_legacy_layout(object: &Map<String, Value>) -> bool {
    !object.contains_key("positions") && LEGACY_MARKERS.iter().any(|key| object.contains_key(*key))
}

/// Rebuild a current document from a flat legacy object.
///
/// Reserved keys with the wrong shape fail the whole conversion. Top-level
/// integers are taken as file offsets; anything else is carried over as an
/// unknown key.
pub(super) fn migrate(
    mut object: Map<String, Value>,
) -> Result<SessionDocument, serde_json::Error> {
    let shelf: Vec<PathBuf> = take_or_default(&mut object, SHELF_KEY)?;
    let bookmarks: Vec<LegacyBookmark> = take_or_default(&mut object, BOOKMARKS_KEY)?;
    let last_opened: Option<PathBuf> = take_or_default(&mut object, LAST_TITLE_KEY)?;
    let button_font_size = take_or(&mut object, BUTTON_FONT_KEY, DEFAULT_BUTTON_FONT_SIZE)?;
    let title_font_size = take_or(&mut object, TITLE_FONT_KEY, DEFAULT_TITLE_FONT_SIZE)?;
    let volume = take_or(&mut object, VOLUME_KEY, DEFAULT_VOLUME)?;

    let mut document = SessionDocument {
        shelf,
        bookmarks: bookmarks
            .into_iter()
            .map(|bookmark| Bookmark {
                file: bookmark.file,
                position_ms: bookmark.pos.max(0) as u64,
                note: bookmark.note,
                extra: bookmark.extra,
            })
            .collect(),
        last_opened,
        ui: UiSettings {
            button_font_size,
            title_font_size,
            extra: Map::new(),
        },
        volume,
        ..SessionDocument::default()
    };
    for (key, value) in object {
        match value.as_i64() {
            Some(offset) => {
                document
                    .positions
                    .insert(PathBuf::from(key), offset.max(0) as u64);
            }
            None => {
                document.extra.insert(key, value);
            }
        }
    }
    Ok(document)
}

fn take_or_default<T>(object: &mut Map<String, Value>, key: &str) -> Result<T, serde_json::Error>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match object.remove(key) {
        Some(value) => serde_json::from_value(value),
        None => Ok(T::default()),
    }
}

fn take_or<T>(
    object: &mut Map<String, Value>,
    key: &str,
    fallback: T,
) -> Result<T, serde_json::Error>
where
    T: for<'de> Deserialize<'de>,
{
    match object.remove(key) {
        Some(value) => serde_json::from_value(value),
        None => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn detects_flat_layout_by_reserved_keys() {
        assert!(is_legacy_layout(&object(json!({"__bookshelf__": []}))));
        assert!(!is_legacy_layout(&object(json!({"positions": {}}))));
        assert!(!is_legacy_layout(&object(json!({"volume": 80}))));
    }

    #[test]
    fn migrates_offsets_bookmarks_and_preferences() {
        let document = migrate(object(json!({
            "__bookshelf__": ["/books/a.m4b"],
            "__bookmarks__": [{"file": "/books/a.m4b", "pos": 5000, "note": "intro"}],
            "__last_book__": "/books/a.m4b",
            "ui_btn_size": 14,
            "ui_title_size": 18,
            "volume": 70,
            "/books/a.m4b": 12000,
            "/books/b.mp3": -1,
            "theme": "dark"
        })))
        .unwrap();

        assert_eq!(document.shelf, vec![PathBuf::from("/books/a.m4b")]);
        assert_eq!(document.resume_position("/books/a.m4b".as_ref()), 12_000);
        assert_eq!(document.resume_position("/books/b.mp3".as_ref()), 0);
        assert!(document.positions.contains_key(&PathBuf::from("/books/b.mp3")));
        assert_eq!(document.bookmarks[0].position_ms, 5000);
        assert_eq!(document.bookmarks[0].note, "intro");
        assert_eq!(document.last_opened, Some(PathBuf::from("/books/a.m4b")));
        assert_eq!(document.ui.button_font_size, 14);
        assert_eq!(document.ui.title_font_size, 18);
        assert_eq!(document.volume, 70);
        assert_eq!(document.extra.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn malformed_reserved_key_fails_conversion() {
        let result = migrate(object(json!({"__bookshelf__": "not a list"})));
        assert!(result.is_err());
    }
}
