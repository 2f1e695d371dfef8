//! Persistent listening state: offsets, the shelf, bookmarks and preferences.
//!
//! Everything lives in one base64-wrapped JSON file in the app directory.
//! [`SessionStore`] is the only writer; the rest of the crate goes through it.

use std::path::PathBuf;

use crate::app_dirs;

pub mod codec;
mod document;
mod legacy;
mod store;
mod store_io;


pub use document::{
    Bookmark, DEFAULT_BUTTON_FONT_SIZE, DEFAULT_TITLE_FONT_SIZE, DEFAULT_VOLUME, MAX_FONT_SIZE,
    MAX_VOLUME, MIN_FONT_SIZE, SessionDocument, UiSettings,
};
pub use store::{DataView, SessionStore};
pub use store_io::SessionError;

/// Filename of the session store inside the app directory.
pub const STORE_FILE_NAME: &str = "resume.dat";

/// Resolve the store location, creating the app directory if needed.
pub fn store_path() -> Result<PathBuf, SessionError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(STORE_FILE_NAME))
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> SessionError {
    match error {
        app_dirs::AppDirError::NoBaseDir => SessionError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            SessionError::CreateDir { path, source }
        }
    }
}
