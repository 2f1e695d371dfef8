use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, info};

use super::engine::{AudioTrack, EngineError, PlaybackEngine, TrackDescriptor, normalize_tracks};

/// The single stream rodio exposes for a decoded file.
const DEFAULT_TRACK_ID: i64 = 0;

/// [`PlaybackEngine`] on top of the default rodio output device.
pub struct RodioEngine {
    stream: OutputStream,
    sink: Option<Sink>,
    loaded: Option<PathBuf>,
    length: Option<Duration>,
    volume: u32,
}

impl RodioEngine {
    /// Open the default output device.
    pub fn new() -> Result<Self, EngineError> {
        let mut stream = OutputStreamBuilder::open_default_stream().map_err(|err| {
            EngineError::OutputUnavailable {
                message: err.to_string(),
            }
        })?;
        stream.log_on_drop(false);
        info!("Audio output ready");
        Ok(Self {
            stream,
            sink: None,
            loaded: None,
            length: None,
            volume: 100,
        })
    }

    fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, EngineError> {
        let file = File::open(path).map_err(|source| EngineError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let byte_len = file
            .metadata()
            .map_err(|source| EngineError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let mut builder = Decoder::builder()
            .with_data(BufReader::new(file))
            .with_byte_len(byte_len)
            .with_seekable(true);
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            builder = builder.with_hint(extension);
        }
        builder.build().map_err(|err| EngineError::Decode {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    fn sink(&self) -> Result<&Sink, EngineError> {
        self.sink.as_ref().ok_or(EngineError::NoMedia)
    }

    fn gain(&self) -> f32 {
        self.volume as f32 / 100.0
    }
}

impl PlaybackEngine for RodioEngine {
    fn load(&mut self, file: &Path) -> Result<(), EngineError> {
        let decoder = Self::open_decoder(file)?;
        self.stop();
        self.length = decoder.total_duration();
        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.set_volume(self.gain());
        sink.append(decoder);
        self.sink = Some(sink);
        self.loaded = Some(file.to_path_buf());
        debug!(path = %file.display(), length = ?self.length, "Media loaded");
        Ok(())
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.loaded = None;
        self.length = None;
    }

    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .is_some_and(|sink| !sink.is_paused() && !sink.empty())
    }

    fn position_ms(&self) -> u64 {
        self.sink
            .as_ref()
            .map(|sink| sink.get_pos().as_millis() as u64)
            .unwrap_or(0)
    }

    fn set_position_ms(&mut self, ms: u64) -> Result<(), EngineError> {
        let target = match self.length {
            Some(length) => Duration::from_millis(ms).min(length),
            None => Duration::from_millis(ms),
        };
        self.sink()?
            .try_seek(target)
            .map_err(|err| EngineError::Seek {
                message: err.to_string(),
            })
    }

    fn length_ms(&self) -> Option<u64> {
        self.length.map(|length| length.as_millis() as u64)
    }

    fn audio_tracks(&self) -> Vec<AudioTrack> {
        if self.loaded.is_none() {
            return Vec::new();
        }
        normalize_tracks([TrackDescriptor::Record {
            id: DEFAULT_TRACK_ID,
            name: "Default",
        }])
    }

    fn active_track(&self) -> Option<i64> {
        self.loaded.as_ref().map(|_| DEFAULT_TRACK_ID)
    }

    fn set_active_track(&mut self, id: i64) -> Result<(), EngineError> {
        self.sink()?;
        if id == DEFAULT_TRACK_ID {
            Ok(())
        } else {
            Err(EngineError::UnknownTrack { id })
        }
    }

    fn volume(&self) -> u32 {
        self.volume
    }

    fn set_volume(&mut self, percent: u32) {
        self.volume = percent;
        if let Some(sink) = &self.sink {
            sink.set_volume(self.gain());
        }
    }
}
