use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use super::codec::{self, CodecError};
use super::document::SessionDocument;
use super::legacy;

/// Errors raised while reading or writing the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unable to create store directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unreadable session store {path}: {source}")]
    Decode { path: PathBuf, source: CodecError },
    #[error("Failed to encode session store for {path}: {source}")]
    Encode { path: PathBuf, source: CodecError },
    #[error("Invalid session data in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Read and decode the store at `path`. A missing file yields `Ok(None)`.
pub(super) fn read_document(path: &Path) -> Result<Option<SessionDocument>, SessionError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SessionError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let value = codec::decode_value(&bytes).map_err(|source| SessionError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    document_from_value(value)
        .map(Some)
        .map_err(|source| SessionError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Interpret a decoded JSON object in either the current or the flat legacy layout.
pub(super) fn document_from_value(value: Value) -> Result<SessionDocument, serde_json::Error> {
    let document = match value {
        Value::Object(object) if legacy::is_legacy_layout(&object) => legacy::migrate(object)?,
        other => serde_json::from_value(other)?,
    };
    Ok(document.normalized())
}

/// Encode `document` and replace the store at `path` in one rename.
pub(super) fn write_document(path: &Path, document: &SessionDocument) -> Result<(), SessionError> {
    let encoded = codec::encode(document).map_err(|source| SessionError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, encoded.as_bytes())
}

/// Move an unreadable store aside so the next save does not destroy it.
pub(super) fn set_aside_unreadable(path: &Path) -> Option<PathBuf> {
    let backup = path.with_extension("dat.unreadable");
    match std::fs::rename(path, &backup) {
        Ok(()) => Some(backup),
        Err(err) => {
            tracing::warn!("Could not move aside {}: {err}", path.display());
            None
        }
    }
}

/// Write to a sibling temp file, fsync it, then rename over `path`.
///
/// Readers see either the previous store or the new one, never a torn file.
pub(super) fn atomic_write(path: &Path, data: &[u8]) -> Result<(), SessionError> {
    let write_error = |path: &Path, source| SessionError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().ok_or_else(|| {
        write_error(
            path,
            std::io::Error::other("store path has no parent directory"),
        )
    })?;
    std::fs::create_dir_all(dir).map_err(|source| SessionError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .ok_or_else(|| write_error(path, std::io::Error::other("store path has no file name")))?;

    let (tmp_path, mut file) = create_temp_file(dir, &file_name.to_string_lossy())
        .map_err(|source| write_error(path, source))?;
    let written = file
        .write_all(data)
        .and_then(|()| file.sync_all())
        .and_then(|()| {
            drop(file);
            replace_file(&tmp_path, path)
        });
    if let Err(source) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_error(path, source));
    }
    sync_parent_dir(dir).map_err(|source| write_error(dir, source))
}

fn create_temp_file(dir: &Path, file_name: &str) -> std::io::Result<(PathBuf, std::fs::File)> {
    use rand::TryRngCore;

    let mut last_err = None;
    for _ in 0..5 {
        let mut bytes = [0u8; 6];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| std::io::Error::other(format!("temp suffix unavailable: {err}")))?;
        let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let tmp_path = dir.join(format!("{file_name}.tmp-{suffix}"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::other("no free temp file name")))
}

fn replace_file(temp_path: &Path, path: &Path) -> std::io::Result<()> {
    match std::fs::rename(temp_path, path) {
        Ok(()) => Ok(()),
        #[cfg(target_os = "windows")]
        Err(err)
            if err.kind() == std::io::ErrorKind::AlreadyExists
                || err.kind() == std::io::ErrorKind::PermissionDenied =>
        {
            match std::fs::remove_file(path) {
                Err(inner) if inner.kind() != std::io::ErrorKind::NotFound => return Err(inner),
                _ => {}
            }
            std::fs::rename(temp_path, path)
        }
        Err(err) => Err(err),
    }
}

fn sync_parent_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::fs::File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}
