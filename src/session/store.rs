use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::Map;

use super::codec;
use super::document::{Bookmark, MAX_VOLUME, SessionDocument, clamp_font_size};
use super::store_io::{self, SessionError};

/// How the stored data should be presented on the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataView {
    /// The parsed document as indented JSON.
    Decoded,
    /// The file content exactly as written, base64 and all.
    Encoded,
}

/// Owner of the persisted [`SessionDocument`].
///
/// Mutations only touch the in-memory document. Callers follow each one with
/// [`SessionStore::save`]; the store never batches or defers writes.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    document: SessionDocument,
}

impl SessionStore {
    /// Load the store at `path`, falling back to defaults on any failure.
    ///
    /// An unreadable file is moved aside before defaults are used so a later
    /// save does not overwrite the only copy.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = match store_io::read_document(&path) {
            Ok(Some(document)) => document,
            Ok(None) => SessionDocument::default(),
            Err(err) => {
                tracing::warn!("Starting with a fresh session: {err}");
                if matches!(
                    err,
                    SessionError::Decode { .. } | SessionError::Parse { .. }
                ) {
                    store_io::set_aside_unreadable(&path);
                }
                SessionDocument::default()
            }
        };
        Self { path, document }
    }

    /// Load the store from its default location inside the app directory.
    pub fn load_default() -> Result<Self, SessionError> {
        Ok(Self::load(super::store_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &SessionDocument {
        &self.document
    }

    /// Encode and atomically replace the backing file.
    pub fn save(&self) -> Result<(), SessionError> {
        store_io::write_document(&self.path, &self.document)
    }

    /// Remember `ms` as the offset for `file`. Negative offsets store as zero.
    pub fn record_position(&mut self, file: &Path, ms: i64) {
        self.document
            .positions
            .insert(file.to_path_buf(), ms.max(0) as u64);
    }

    pub fn resume_position(&self, file: &Path) -> u64 {
        self.document.resume_position(file)
    }

    /// Append `file` to the shelf unless it is already there.
    pub fn add_to_shelf(&mut self, file: &Path) {
        if !self.document.shelf.iter().any(|entry| entry == file) {
            self.document.shelf.push(file.to_path_buf());
        }
    }

    /// Drop shelf entries whose file no longer exists. Returns how many went.
    pub fn prune_shelf(&mut self) -> usize {
        let before = self.document.shelf.len();
        self.document.shelf.retain(|path| path.exists());
        before - self.document.shelf.len()
    }

    pub fn shelf(&self) -> &[PathBuf] {
        &self.document.shelf
    }

    pub fn add_bookmark(&mut self, file: &Path, ms: i64, note: impl Into<String>) {
        self.document.bookmarks.push(Bookmark {
            file: file.to_path_buf(),
            position_ms: ms.max(0) as u64,
            note: note.into(),
            extra: Map::new(),
        });
    }

    /// Remove the bookmarks at `indices`. Out-of-range and repeated indices
    /// are ignored. Returns how many bookmarks were removed.
    pub fn delete_bookmarks(&mut self, indices: &[usize]) -> usize {
        let doomed: BTreeSet<usize> = indices
            .iter()
            .copied()
            .filter(|&index| index < self.document.bookmarks.len())
            .collect();
        for &index in doomed.iter().rev() {
            self.document.bookmarks.remove(index);
        }
        doomed.len()
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.document.bookmarks
    }

    pub fn set_last_opened(&mut self, file: &Path) {
        self.document.last_opened = Some(file.to_path_buf());
    }

    pub fn last_opened(&self) -> Option<&Path> {
        self.document.last_opened.as_deref()
    }

    /// Store the volume, capped at the highest value the edit field allows.
    pub fn set_volume(&mut self, volume: u32) {
        self.document.volume = volume.min(MAX_VOLUME);
    }

    pub fn volume(&self) -> u32 {
        self.document.volume
    }

    pub fn set_font_sizes(&mut self, button: u32, title: u32) {
        self.document.ui.button_font_size = clamp_font_size(button);
        self.document.ui.title_font_size = clamp_font_size(title);
    }

    /// Forget everything and start over from the default document.
    pub fn wipe(&mut self) {
        self.document = SessionDocument::default();
    }

    /// Render the stored data for display.
    ///
    /// `Encoded` shows what is on disk, so it reflects the last save rather
    /// than unsaved edits.
    pub fn view(&self, view: DataView) -> Result<String, SessionError> {
        match view {
            DataView::Decoded => {
                serde_json::to_string_pretty(&self.document).map_err(|source| {
                    SessionError::Parse {
                        path: self.path.clone(),
                        source,
                    }
                })
            }
            DataView::Encoded => match std::fs::read(&self.path) {
                Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
                Err(source) => Err(SessionError::Read {
                    path: self.path.clone(),
                    source,
                }),
            },
        }
    }

    /// Write the decoded document to `target` as readable JSON.
    pub fn export_to(&self, target: &Path) -> Result<(), SessionError> {
        let json = self.view(DataView::Decoded)?;
        store_io::atomic_write(target, json.as_bytes())
    }

    /// Replace the document with the one in `source`.
    ///
    /// Accepts plain JSON exports as well as encoded store files. On any
    /// error the current document is left untouched.
    pub fn import_from(&mut self, source: &Path) -> Result<(), SessionError> {
        let bytes = std::fs::read(source).map_err(|err| SessionError::Read {
            path: source.to_path_buf(),
            source: err,
        })?;
        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(_) => codec::decode_value(&bytes).map_err(|err| SessionError::Decode {
                path: source.to_path_buf(),
                source: err,
            })?,
        };
        self.document =
            store_io::document_from_value(value).map_err(|err| SessionError::Parse {
                path: source.to_path_buf(),
                source: err,
            })?;
        Ok(())
    }
}
