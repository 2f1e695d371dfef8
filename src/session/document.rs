use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MIN_FONT_SIZE: u32 = 6;
pub const MAX_FONT_SIZE: u32 = 32;
pub const DEFAULT_BUTTON_FONT_SIZE: u32 = 10;
pub const DEFAULT_TITLE_FONT_SIZE: u32 = 12;
pub const DEFAULT_VOLUME: u32 = 100;
/// Highest volume the edit field accepts; the slider stops at 100.
pub const MAX_VOLUME: u32 = 200;

/// Persisted root of all listening state.
///
/// Every field deserializes with a default so older or partial stores still
/// load. Keys this version does not know about land in the `extra` map of
/// the record that holds them and are written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    /// Last known offset in milliseconds, keyed by absolute file path.
    #[serde(default)]
    pub positions: BTreeMap<PathBuf, u64>,
    /// Titles the user has opened, in first-opened order, without duplicates.
    #[serde(default)]
    pub shelf: Vec<PathBuf>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub last_opened: Option<PathBuf>,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default = "default_volume")]
    pub volume: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A saved spot in a title with a free-form note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub file: PathBuf,
    pub position_ms: u64,
    #[serde(default)]
    pub note: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default = "default_button_font_size")]
    pub button_font_size: u32,
    #[serde(default = "default_title_font_size")]
    pub title_font_size: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            button_font_size: DEFAULT_BUTTON_FONT_SIZE,
            title_font_size: DEFAULT_TITLE_FONT_SIZE,
            extra: Map::new(),
        }
    }
}

impl Default for SessionDocument {
    fn default() -> Self {
        Self {
            positions: BTreeMap::new(),
            shelf: Vec::new(),
            bookmarks: Vec::new(),
            last_opened: None,
            ui: UiSettings::default(),
            volume: DEFAULT_VOLUME,
            extra: Map::new(),
        }
    }
}

impl SessionDocument {
    /// Bring range-limited preferences back into range and drop shelf duplicates.
    pub fn normalized(mut self) -> Self {
        self.ui.button_font_size = clamp_font_size(self.ui.button_font_size);
        self.ui.title_font_size = clamp_font_size(self.ui.title_font_size);
        self.volume = self.volume.min(MAX_VOLUME);
        let mut seen = std::collections::BTreeSet::new();
        self.shelf.retain(|path| seen.insert(path.clone()));
        self
    }

    /// Saved offset for `file`, or zero for a title never played.
    pub fn resume_position(&self, file: &std::path::Path) -> u64 {
        self.positions.get(file).copied().unwrap_or(0)
    }
}

pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

fn default_volume() -> u32 {
    DEFAULT_VOLUME
}

fn default_button_font_size() -> u32 {
    DEFAULT_BUTTON_FONT_SIZE
}

fn default_title_font_size() -> u32 {
    DEFAULT_TITLE_FONT_SIZE
}
