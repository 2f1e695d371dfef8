//! A throwaway user profile for integration tests.
//!
//! Points the config root and both external tools at a fresh temp directory
//! so tests never read the real store or spawn a real `ffmpeg`/`ffprobe`.
//! Process environment is shared between test threads, so only one
//! `ScratchHome` exists at a time.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use audioshelf::app_dirs::{APP_DIR_NAME, CONFIG_HOME_ENV};
use audioshelf::external_tools::{FFMPEG_ENV, FFPROBE_ENV};
use audioshelf::session::STORE_FILE_NAME;
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub struct ScratchHome {
    temp: TempDir,
    saved: Vec<(&'static str, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScratchHome {
    pub fn new() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let temp = tempfile::tempdir().expect("create scratch home");
        let config_home = temp.path().join("config");
        std::fs::create_dir_all(&config_home).expect("create config home");
        let missing_tool = temp.path().join("no-such-tool");
        let overrides = [
            (CONFIG_HOME_ENV, config_home.into_os_string()),
            (FFMPEG_ENV, missing_tool.clone().into_os_string()),
            (FFPROBE_ENV, missing_tool.into_os_string()),
        ];
        let saved = overrides
            .into_iter()
            .map(|(key, value)| {
                let previous = std::env::var_os(key);
                // SAFETY: every mutation happens while ENV_LOCK is held.
                unsafe { std::env::set_var(key, value) };
                (key, previous)
            })
            .collect();
        Self {
            temp,
            saved,
            _lock: lock,
        }
    }

    /// The `.audioshelf` folder the store and logs resolve to, created on demand.
    pub fn app_dir(&self) -> PathBuf {
        let dir = self.temp.path().join("config").join(APP_DIR_NAME);
        std::fs::create_dir_all(&dir).expect("create app dir");
        dir
    }

    pub fn store_file(&self) -> PathBuf {
        self.app_dir().join(STORE_FILE_NAME)
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write a placeholder title next to the config home.
    pub fn title(&self, name: &str) -> PathBuf {
        let path = self.temp.path().join(name);
        std::fs::write(&path, b"not really audio").expect("write title");
        path
    }
}

impl Drop for ScratchHome {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..) {
            // SAFETY: ENV_LOCK is still held until `_lock` drops after this body.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
