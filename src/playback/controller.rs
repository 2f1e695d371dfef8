//! Session controller tying the engine, the store and the visualizer together.
//!
//! The controller owns one title at a time. Every transport action goes to
//! the engine first, is then reflected in the [`SessionStore`], and finally
//! re-aims the [`VisualizationPipeline`] at the new playhead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::advisory::Advisory;
use super::chapters::{self, Chapter, ChapterProber, FfprobeChapterProber};
use super::engine::{AudioTrack, EngineError, PlaybackEngine};
use super::metadata::{BookMetadata, LoftyMetadataReader, MetadataReader};
use super::time_entry::{format_hms, parse_hms};
use super::volume::{self, VolumeChange};
use crate::session::{SessionError, SessionStore};
use crate::visualizer::{RenderMode, VisualizationPipeline};

/// Distance covered by the skip buttons.
pub const SKIP_STEP_MS: i64 = 10_000;
/// Interval between position polls while a title is loaded.
pub const POSITION_TICK: Duration = Duration::from_millis(200);
/// Interval between visualizer frames.
pub const RENDER_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Could not load {path}: {source}")]
    Load { path: PathBuf, source: EngineError },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("No chapter {index}; the title has {count}")]
    ChapterOutOfRange { index: usize, count: usize },
    #[error("No bookmark {index}; there are {count}")]
    BookmarkOutOfRange { index: usize, count: usize },
    #[error("No audio track {index}; the title has {count}")]
    TrackOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loaded,
    Playing,
}

/// Transient facts about the loaded title. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub file: PathBuf,
    pub tracks: Vec<AudioTrack>,
    pub active_track: Option<i64>,
    pub chapters: Vec<Chapter>,
    pub metadata: BookMetadata,
    pub last_position_ms: u64,
    /// Playhead before the most recent bookmark jump.
    pub previous_position_ms: Option<u64>,
}

pub struct PlaybackSessionController<E: PlaybackEngine> {
    engine: E,
    store: SessionStore,
    pipeline: VisualizationPipeline,
    chapter_prober: Box<dyn ChapterProber>,
    metadata_reader: Box<dyn MetadataReader>,
    state: SessionState,
    session: Option<PlaybackSession>,
}

impl<E: PlaybackEngine> PlaybackSessionController<E> {
    /// Build a controller using `ffprobe` for chapters and `lofty` for tags.
    ///
    /// The stored volume is applied to the engine right away and shelf
    /// entries for deleted files are pruned.
    pub fn new(engine: E, store: SessionStore, pipeline: VisualizationPipeline) -> Self {
        let mut controller = Self {
            engine,
            store,
            pipeline,
            chapter_prober: Box::new(FfprobeChapterProber::new()),
            metadata_reader: Box::new(LoftyMetadataReader),
            state: SessionState::Idle,
            session: None,
        };
        let volume = controller.store.volume();
        controller.engine.set_volume(volume);
        controller.shelf_titles();
        controller
    }

    pub fn with_chapter_prober(mut self, prober: Box<dyn ChapterProber>) -> Self {
        self.chapter_prober = prober;
        self
    }

    pub fn with_metadata_reader(mut self, reader: Box<dyn MetadataReader>) -> Self {
        self.metadata_reader = reader;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.session.as_ref().map(|session| session.file.as_path())
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn pipeline(&self) -> &VisualizationPipeline {
        &self.pipeline
    }

    /// Load `file` paused at its remembered position.
    ///
    /// The running visualizer is stopped first and the current title's
    /// position is saved. If the engine cannot load `file`, the current
    /// title stays loaded (and keeps playing if it was) and the error is
    /// returned.
    pub fn open(&mut self, file: &Path) -> Result<(), PlaybackError> {
        self.pipeline.stop();
        self.remember_position();
        self.persist();
        if let Err(source) = self.engine.load(file) {
            warn!("Could not open {}: {source}", file.display());
            self.resume_after_failed_open();
            return Err(PlaybackError::Load {
                path: file.to_path_buf(),
                source,
            });
        }

        let resume_ms = self.store.resume_position(file);
        if let Err(err) = self.engine.set_position_ms(resume_ms) {
            warn!("Could not resume {} at {resume_ms} ms: {err}", file.display());
        }
        self.store.add_to_shelf(file);
        self.store.set_last_opened(file);
        self.persist();

        let (tracks, active_track) = self.select_initial_track();
        let chapters = self.chapter_prober.probe(file).unwrap_or_else(|err| {
            debug!("Chapters unavailable for {}: {err}", file.display());
            Vec::new()
        });
        let metadata = self.metadata_reader.read(file).unwrap_or_else(|err| {
            debug!("Metadata unavailable for {}: {err}", file.display());
            BookMetadata::default()
        });
        info!(
            path = %file.display(),
            resume_ms,
            chapters = chapters.len(),
            "Opened title"
        );
        self.session = Some(PlaybackSession {
            file: file.to_path_buf(),
            tracks,
            active_track,
            chapters,
            metadata,
            last_position_ms: resume_ms,
            previous_position_ms: None,
        });
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Open the title remembered from the previous session, if it still
    /// exists.
    pub fn resume_last_opened(&mut self) -> Option<Advisory> {
        let path = self.store.last_opened()?.to_path_buf();
        if !path.exists() {
            return Some(Advisory::LastTitleMissing { path });
        }
        match self.open(&path) {
            Ok(()) => None,
            Err(err) => Some(Advisory::OpenFailed {
                path,
                message: err.to_string(),
            }),
        }
    }

    pub fn play(&mut self) -> Option<Advisory> {
        let Some(file) = self.current_file().map(Path::to_path_buf) else {
            return Some(Advisory::NoTitleLoaded);
        };
        if self.state == SessionState::Playing {
            return None;
        }
        self.engine.play();
        let offset = self.engine.position_ms();
        self.pipeline.restart(&file, offset);
        self.state = SessionState::Playing;
        None
    }

    pub fn pause(&mut self) {
        if self.state != SessionState::Playing {
            return;
        }
        self.engine.pause();
        self.pipeline.stop();
        self.state = SessionState::Loaded;
    }

    /// Play when paused, pause when playing.
    pub fn toggle(&mut self) -> Option<Advisory> {
        if self.state == SessionState::Playing {
            self.pause();
            None
        } else {
            self.play()
        }
    }

    /// Move the playhead to `ms`, clamped at zero. Ignored when idle.
    pub fn seek(&mut self, ms: i64) {
        let Some(file) = self.current_file().map(Path::to_path_buf) else {
            return;
        };
        let target = ms.max(0) as u64;
        if let Err(err) = self.engine.set_position_ms(target) {
            warn!("Seek to {target} ms failed: {err}");
        }
        if let Some(session) = self.session.as_mut() {
            session.last_position_ms = target;
        }
        if self.state == SessionState::Playing {
            self.pipeline.restart(&file, target);
        }
    }

    pub fn skip(&mut self, delta_ms: i64) {
        if self.state == SessionState::Idle {
            return;
        }
        let now = self.engine.position_ms() as i64;
        self.seek(now.saturating_add(delta_ms));
    }

    pub fn goto_chapter(&mut self, offset_ms: u64) {
        self.seek(offset_ms as i64);
    }

    /// Jump to the chapter at `index` in the chapter list.
    pub fn goto_chapter_at(&mut self, index: usize) -> Result<(), PlaybackError> {
        let chapters = self.chapters();
        let offset = chapters
            .get(index)
            .map(|chapter| chapter.offset_ms)
            .ok_or(PlaybackError::ChapterOutOfRange {
                index,
                count: chapters.len(),
            })?;
        self.goto_chapter(offset);
        Ok(())
    }

    /// Jump to the first chapter that starts after the playhead. Returns
    /// `false` when there is none.
    pub fn next_chapter(&mut self) -> bool {
        let now = self.engine.position_ms();
        match chapters::next_after(self.chapters(), now) {
            Some(chapter) => {
                let offset = chapter.offset_ms;
                self.goto_chapter(offset);
                true
            }
            None => false,
        }
    }

    pub fn chapters(&self) -> &[Chapter] {
        self.session
            .as_ref()
            .map(|session| session.chapters.as_slice())
            .unwrap_or_default()
    }

    /// Seek to a typed `HH:MM:SS` timestamp. Malformed text is ignored and
    /// yields `false`.
    pub fn seek_to_time_entry(&mut self, text: &str) -> bool {
        if self.state == SessionState::Idle {
            return false;
        }
        match parse_hms(text) {
            Some(ms) => {
                self.seek(ms as i64);
                true
            }
            None => false,
        }
    }

    /// Poll the engine and persist the playhead.
    ///
    /// Also notices when playback ran off the end of the title and drops
    /// back to `Loaded`.
    pub fn tick(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        if self.state == SessionState::Playing && !self.engine.is_playing() {
            debug!("Playback finished");
            self.pipeline.stop();
            self.state = SessionState::Loaded;
        }
        self.remember_position();
        self.persist();
    }

    /// Text for the "Continue From" label.
    pub fn continue_from_label(&self) -> Option<String> {
        self.session
            .as_ref()
            .map(|session| format!("Continue From: {}", format_hms(session.last_position_ms)))
    }

    /// Persist the playhead and last title, stop the visualizer and unload.
    pub fn close(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        self.remember_position();
        if let Some(file) = self.current_file().map(Path::to_path_buf) {
            self.store.set_last_opened(&file);
        }
        self.persist();
        self.pipeline.stop();
        self.engine.stop();
        self.session = None;
        self.state = SessionState::Idle;
        info!("Closed title");
    }

    /// Apply text typed into the volume field.
    pub fn apply_volume_edit(&mut self, text: &str) -> VolumeChange {
        let change = volume::interpret_edit(text, self.store.volume());
        self.apply_volume(&change);
        change
    }

    /// Apply a volume slider position.
    pub fn set_volume_slider(&mut self, position: i64) -> VolumeChange {
        let change = volume::from_slider(position);
        self.apply_volume(&change);
        change
    }

    pub fn select_audio_track(&mut self, index: usize) -> Result<(), PlaybackError> {
        let Some(session) = self.session.as_mut() else {
            return Err(PlaybackError::TrackOutOfRange { index, count: 0 });
        };
        let id = session
            .tracks
            .get(index)
            .map(|track| track.id)
            .ok_or(PlaybackError::TrackOutOfRange {
                index,
                count: session.tracks.len(),
            })?;
        self.engine.set_active_track(id)?;
        session.active_track = Some(id);
        Ok(())
    }

    /// Bookmark the playhead of the loaded title.
    pub fn add_bookmark(&mut self, note: &str) -> Option<Advisory> {
        let Some(file) = self.current_file().map(Path::to_path_buf) else {
            return Some(Advisory::NoTitleLoaded);
        };
        let position = self.engine.position_ms() as i64;
        self.store.add_bookmark(&file, position, note);
        self.persist();
        None
    }

    /// Jump to bookmark `index`, opening its title when needed.
    ///
    /// A bookmark whose file has gone missing changes nothing and only
    /// produces an advisory.
    pub fn load_bookmark(&mut self, index: usize) -> Result<Option<Advisory>, PlaybackError> {
        let bookmarks = self.store.bookmarks();
        let bookmark = bookmarks
            .get(index)
            .cloned()
            .ok_or(PlaybackError::BookmarkOutOfRange {
                index,
                count: bookmarks.len(),
            })?;
        if !bookmark.file.exists() {
            return Ok(Some(Advisory::BookmarkFileMissing {
                path: bookmark.file,
            }));
        }
        let previous = self
            .current_file()
            .map(|_| self.engine.position_ms());
        if self.current_file() != Some(bookmark.file.as_path()) {
            self.open(&bookmark.file)?;
        }
        self.seek(bookmark.position_ms as i64);
        if let Some(session) = self.session.as_mut() {
            session.previous_position_ms = previous;
        }
        self.store.set_last_opened(&bookmark.file);
        self.persist();
        Ok(None)
    }

    /// Seek back to where the playhead was before the last bookmark jump.
    pub fn return_to_previous_position(&mut self) -> bool {
        let previous = self
            .session
            .as_ref()
            .and_then(|session| session.previous_position_ms);
        match previous {
            Some(ms) => {
                self.seek(ms as i64);
                true
            }
            None => false,
        }
    }

    pub fn delete_bookmarks(&mut self, indices: &[usize]) -> usize {
        let removed = self.store.delete_bookmarks(indices);
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Shelf entries that still exist, pruning the rest from the store.
    pub fn shelf_titles(&mut self) -> Vec<PathBuf> {
        let pruned = self.store.prune_shelf();
        if pruned > 0 {
            info!("Removed {pruned} missing titles from the shelf");
            self.persist();
        }
        self.store.shelf().to_vec()
    }

    pub fn set_font_sizes(&mut self, button: u32, title: u32) {
        self.store.set_font_sizes(button, title);
        self.persist();
    }

    /// Erase all stored data. The loaded title keeps playing.
    /// Reset every stored preference and list. The engine follows the reset
    /// volume.
    pub fn wipe_data(&mut self) {
        self.store.wipe();
        self.persist();
        self.engine.set_volume(self.store.volume());
        info!("Session data wiped");
    }

    /// Replace the stored data with an exported file and save it. A malformed
    /// file changes nothing.
    pub fn import_data(&mut self, source: &Path) -> Result<(), SessionError> {
        self.store.import_from(source)?;
        self.store.save()?;
        self.engine.set_volume(self.store.volume());
        info!("Imported session data from {}", source.display());
        Ok(())
    }

    pub fn render_mode(&self) -> RenderMode {
        self.pipeline.mode()
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.pipeline.set_mode(mode);
    }

    /// Visualizer points for the current mode.
    pub fn render(&self) -> Vec<[f32; 2]> {
        self.pipeline.render()
    }

    fn select_initial_track(&mut self) -> (Vec<AudioTrack>, Option<i64>) {
        let tracks = self.engine.audio_tracks();
        let mut active = self.engine.active_track();
        if active.is_none()
            && let Some(first) = tracks.first()
        {
            match self.engine.set_active_track(first.id) {
                Ok(()) => active = Some(first.id),
                Err(err) => warn!("Could not select audio track {}: {err}", first.id),
            }
        }
        (tracks, active)
    }

    fn apply_volume(&mut self, change: &VolumeChange) {
        self.engine.set_volume(change.applied);
        self.store.set_volume(change.applied);
        self.persist();
    }

    /// Copy the engine playhead into the session and the store.
    fn resume_after_failed_open(&mut self) {
        let Some(file) = self.current_file().map(Path::to_path_buf) else {
            return;
        };
        if self.state == SessionState::Playing {
            if self.engine.is_playing() {
                self.pipeline.restart(&file, self.engine.position_ms());
            } else {
                self.state = SessionState::Loaded;
            }
        }
    }

    fn remember_position(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let position = self.engine.position_ms();
        session.last_position_ms = position;
        self.store.record_position(&session.file, position as i64);
    }

    fn persist(&self) {
        if let Err(err) = self.store.save() {
            warn!("Failed to save session: {err}");
        }
    }
}

impl<E: PlaybackEngine> Drop for PlaybackSessionController<E> {
    fn drop(&mut self) {
        self.pipeline.stop();
    }
}
