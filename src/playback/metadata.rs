use std::path::{Path, PathBuf};

use lofty::prelude::*;
use lofty::tag::{ItemKey, ItemValue};
use thiserror::Error;

/// Longest binary value, as hex, shown before it is cut with an ellipsis.
pub const MAX_DISPLAY_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to read tags from {path}: {source}")]
    Read {
        path: PathBuf,
        source: lofty::error::LoftyError,
    },
}

/// One tag row for the metadata panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub key: String,
    pub value: String,
}

/// An embedded picture that decoded as an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Everything shown about a title besides its audio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub tags: Vec<TagEntry>,
    pub covers: Vec<Cover>,
}

impl BookMetadata {
    /// Value of the first tag named `key`, if any.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|entry| entry.key.eq_ignore_ascii_case(key))
            .map(|entry| entry.value.as_str())
    }
}

pub trait MetadataReader {
    fn read(&self, file: &Path) -> Result<BookMetadata, MetadataError>;
}

/// Tag and cover reader backed by `lofty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyMetadataReader;

impl MetadataReader for LoftyMetadataReader {
    fn read(&self, file: &Path) -> Result<BookMetadata, MetadataError> {
        let tagged = lofty::read_from_path(file).map_err(|source| MetadataError::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let mut metadata = BookMetadata::default();
        for tag in tagged.tags() {
            for item in tag.items() {
                metadata.tags.push(TagEntry {
                    key: key_label(item.key()),
                    value: value_label(item.value()),
                });
            }
            let covers = tag
                .pictures()
                .iter()
                .filter_map(|picture| cover_from_bytes(picture.data()));
            metadata.covers.extend(covers);
        }
        Ok(metadata)
    }
}

fn key_label(key: &ItemKey) -> String {
    match key {
        ItemKey::Unknown(name) => name.clone(),
        other => format!("{other:?}"),
    }
}

/// Text is shown in full; only the hex dump of binary items is shortened.
fn value_label(value: &ItemValue) -> String {
    if let Some(text) = value.text().or_else(|| value.locator()) {
        return text.to_string();
    }
    let hex: String = value
        .binary()
        .unwrap_or_default()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();
    truncate_for_display(&hex)
}

/// Keep embedded pictures that actually decode; anything else is dropped.
pub fn cover_from_bytes(data: &[u8]) -> Option<Cover> {
    image::guess_format(data).ok()?;
    let decoded = image::load_from_memory(data).ok()?;
    Some(Cover {
        data: data.to_vec(),
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Cut `text` to [`MAX_DISPLAY_CHARS`] characters, marking the cut with `…`.
pub fn truncate_for_display(text: &str) -> String {
    match text.char_indices().nth(MAX_DISPLAY_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let image = image::RgbImage::from_pixel(2, 3, image::Rgb([200, 10, 10]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn short_values_are_left_alone() {
        assert_eq!(truncate_for_display("Narrated by"), "Narrated by");
    }

    #[test]
    fn long_values_are_cut_on_char_boundary() {
        let long = "é".repeat(MAX_DISPLAY_CHARS + 5);
        let shown = truncate_for_display(&long);
        assert_eq!(shown.chars().count(), MAX_DISPLAY_CHARS + 1);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn long_text_tags_are_shown_in_full() {
        let description = "d".repeat(1000);
        assert_eq!(
            value_label(&ItemValue::Text(description.clone())),
            description
        );
        assert_eq!(
            value_label(&ItemValue::Locator("https://example.org/book".into())),
            "https://example.org/book"
        );
    }

    #[test]
    fn long_binary_tags_are_cut_after_hex_rendering() {
        let shown = value_label(&ItemValue::Binary(vec![0xab; 400]));
        assert_eq!(shown.chars().count(), MAX_DISPLAY_CHARS + 1);
        assert!(shown.starts_with("abab"));
        assert!(shown.ends_with('…'));
        assert_eq!(value_label(&ItemValue::Binary(vec![0x01, 0xff])), "01ff");
    }

    #[test]
    fn decodable_cover_is_kept_with_dimensions() {
        let cover = cover_from_bytes(&tiny_png()).unwrap();
        assert_eq!((cover.width, cover.height), (2, 3));
    }

    #[test]
    fn undecodable_cover_is_dropped() {
        assert!(cover_from_bytes(b"\x89PNG but not really").is_none());
        assert!(cover_from_bytes(b"plain text").is_none());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.m4b");
        std::fs::write(&path, b"not audio").unwrap();
        assert!(LoftyMetadataReader.read(&path).is_err());
    }

    #[test]
    fn tag_lookup_ignores_case() {
        let metadata = BookMetadata {
            tags: vec![TagEntry {
                key: "TrackTitle".into(),
                value: "Dune".into(),
            }],
            covers: Vec::new(),
        };
        assert_eq!(metadata.tag("tracktitle"), Some("Dune"));
        assert_eq!(metadata.tag("Album"), None);
    }
}
