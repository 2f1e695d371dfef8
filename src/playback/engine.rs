use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors reported by a playback engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No audio output device could be opened.
    #[error("Audio output unavailable: {message}")]
    OutputUnavailable { message: String },
    /// The media file could not be opened.
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The media file could not be decoded.
    #[error("Could not decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    /// The engine refused to move the playhead.
    #[error("Audio seek failed: {message}")]
    Seek { message: String },
    /// The requested audio track does not exist.
    #[error("No audio track with id {id}")]
    UnknownTrack { id: i64 },
    /// An operation needed loaded media but nothing is loaded.
    #[error("No media loaded")]
    NoMedia,
}

/// One selectable audio stream inside a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    pub id: i64,
    pub name: String,
}

/// A track listing as handed over by an engine backend.
///
/// Backends describe streams either as bare `(id, name bytes)` pairs or as
/// named records; both are folded into [`AudioTrack`] before reaching the
/// controller.
#[derive(Debug, Clone, Copy)]
pub enum TrackDescriptor<'a> {
    Pair(i64, &'a [u8]),
    Record { id: i64, name: &'a str },
}

impl AudioTrack {
    /// Normalize a raw descriptor. Negative ids mark the "disabled"
    /// pseudo-track and yield `None`.
    pub fn from_descriptor(descriptor: TrackDescriptor<'_>) -> Option<Self> {
        let (id, name) = match descriptor {
            TrackDescriptor::Pair(id, name) => (id, String::from_utf8_lossy(name).into_owned()),
            TrackDescriptor::Record { id, name } => (id, name.to_string()),
        };
        if id < 0 {
            return None;
        }
        let name = name.trim();
        let name = if name.is_empty() {
            format!("Track {id}")
        } else {
            name.to_string()
        };
        Some(Self { id, name })
    }
}

/// Normalize a backend's track listing, dropping disabled entries.
pub fn normalize_tracks<'a>(
    descriptors: impl IntoIterator<Item = TrackDescriptor<'a>>,
) -> Vec<AudioTrack> {
    descriptors
        .into_iter()
        .filter_map(AudioTrack::from_descriptor)
        .collect()
}

/// The media engine the session controller drives.
///
/// Positions are in milliseconds. Volume is a percentage where 100 is unity
/// gain; engines accept values above 100 as amplification.
pub trait PlaybackEngine {
    /// Replace the current media with `file`, paused. A failed load leaves the
    /// current media untouched.
    fn load(&mut self, file: &Path) -> Result<(), EngineError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn position_ms(&self) -> u64;
    fn set_position_ms(&mut self, ms: u64) -> Result<(), EngineError>;
    /// Total length of the loaded media, when known.
    fn length_ms(&self) -> Option<u64>;
    fn audio_tracks(&self) -> Vec<AudioTrack>;
    fn active_track(&self) -> Option<i64>;
    fn set_active_track(&mut self, id: i64) -> Result<(), EngineError>;
    fn volume(&self) -> u32;
    fn set_volume(&mut self, percent: u32);
}
