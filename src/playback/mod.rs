//! Playback of one title at a time and everything shown alongside it.

mod advisory;
pub mod chapters;
mod controller;
mod engine;
pub mod metadata;
mod rodio_engine;
pub mod time_entry;
pub mod volume;

pub use advisory::Advisory;
pub use chapters::{Chapter, ChapterError, ChapterProber, FfprobeChapterProber};
pub use controller::{
    POSITION_TICK, PlaybackError, PlaybackSession, PlaybackSessionController, RENDER_TICK,
    SKIP_STEP_MS, SessionState,
};
pub use engine::{AudioTrack, EngineError, PlaybackEngine, TrackDescriptor, normalize_tracks};
pub use metadata::{BookMetadata, Cover, LoftyMetadataReader, MetadataError, MetadataReader};
pub use rodio_engine::RodioEngine;
pub use volume::VolumeChange;
