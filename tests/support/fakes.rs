use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use audioshelf::playback::{
    AudioTrack, EngineError, PlaybackEngine, TrackDescriptor, normalize_tracks,
};
use audioshelf::visualizer::{DecodeRequest, LevelSink, LevelWorker, WorkerFactory};

/// Shared, ordered record of everything the fakes were asked to do.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|candidate| candidate == entry)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Engine that plays nothing and logs every call by file name.
pub struct ScriptedEngine {
    log: CallLog,
    position: Arc<Mutex<u64>>,
    loaded: Option<PathBuf>,
    playing: bool,
    volume: u32,
    active_track: Option<i64>,
}

impl ScriptedEngine {
    /// The engine plus a handle for moving its playhead from the test.
    pub fn new(log: CallLog) -> (Self, Arc<Mutex<u64>>) {
        let position = Arc::new(Mutex::new(0));
        let engine = Self {
            log,
            position: Arc::clone(&position),
            loaded: None,
            playing: false,
            volume: 100,
            active_track: None,
        };
        (engine, position)
    }
}

impl PlaybackEngine for ScriptedEngine {
    fn load(&mut self, file: &Path) -> Result<(), EngineError> {
        self.log.push(format!("load {}", file_name(file)));
        self.loaded = Some(file.to_path_buf());
        self.playing = false;
        *self.position.lock().unwrap() = 0;
        Ok(())
    }

    fn play(&mut self) {
        self.log.push("play");
        self.playing = true;
    }

    fn pause(&mut self) {
        self.log.push("pause");
        self.playing = false;
    }

    fn stop(&mut self) {
        self.log.push("stop");
        self.loaded = None;
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn position_ms(&self) -> u64 {
        *self.position.lock().unwrap()
    }

    fn set_position_ms(&mut self, ms: u64) -> Result<(), EngineError> {
        self.log.push(format!("seek {ms}"));
        *self.position.lock().unwrap() = ms;
        Ok(())
    }

    fn length_ms(&self) -> Option<u64> {
        self.loaded.as_ref().map(|_| 3_600_000)
    }

    fn audio_tracks(&self) -> Vec<AudioTrack> {
        normalize_tracks([
            TrackDescriptor::Pair(-1, b"Disable"),
            TrackDescriptor::Pair(1, b"Track 1"),
        ])
    }

    fn active_track(&self) -> Option<i64> {
        self.active_track
    }

    fn set_active_track(&mut self, id: i64) -> Result<(), EngineError> {
        self.log.push(format!("track {id}"));
        self.active_track = Some(id);
        Ok(())
    }

    fn volume(&self) -> u32 {
        self.volume
    }

    fn set_volume(&mut self, percent: u32) {
        self.log.push(format!("volume {percent}"));
        self.volume = percent;
    }
}

/// Worker factory that logs start and stop in call order.
pub struct LoggingWorkers {
    pub log: CallLog,
}

struct LoggingWorker {
    log: CallLog,
    name: String,
}

impl LevelWorker for LoggingWorker {
    fn stop(&mut self) {
        self.log.push(format!("worker stop {}", self.name));
    }
}

impl WorkerFactory for LoggingWorkers {
    fn spawn(&self, request: DecodeRequest, _sink: LevelSink) -> Box<dyn LevelWorker> {
        let name = format!("{}@{}", file_name(&request.path), request.start_ms);
        self.log.push(format!("worker start {name}"));
        Box::new(LoggingWorker {
            log: self.log.clone(),
            name,
        })
    }
}
