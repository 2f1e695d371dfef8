use std::fmt;
use std::path::PathBuf;

/// A user-facing notice raised by a controller action.
///
/// Advisories are informational: the action they accompany has already been
/// carried out (or deliberately skipped) by the time one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// A transport action was requested with nothing loaded.
    NoTitleLoaded,
    /// The typed volume was out of range and has been reset to 100.
    VolumeReset { requested: u32 },
    /// The volume was accepted but is loud enough to harm hearing.
    HighVolume { volume: u32 },
    /// The title remembered from the last session no longer exists.
    LastTitleMissing { path: PathBuf },
    /// A bookmark points at a file that no longer exists.
    BookmarkFileMissing { path: PathBuf },
    /// The engine could not load a title.
    OpenFailed { path: PathBuf, message: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTitleLoaded => write!(f, "Please open an audio book first."),
            Self::VolumeReset { requested } => {
                write!(f, "Volume {requested} is too high. Resetting to 100.")
            }
            Self::HighVolume { volume } => {
                write!(f, "Volume {volume} is above 100. High volume can damage hearing.")
            }
            Self::LastTitleMissing { path } => {
                write!(f, "Last title not found: {}", path.display())
            }
            Self::BookmarkFileMissing { path } => {
                write!(f, "Bookmarked file not found: {}", path.display())
            }
            Self::OpenFailed { path, message } => {
                write!(f, "Could not open {}: {message}", path.display())
            }
        }
    }
}
