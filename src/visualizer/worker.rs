//! Background decode of the playing title into a stream of level samples.
//!
//! Each worker owns one `ffmpeg` child that seeks to the playhead and writes
//! 8 kHz mono 16-bit PCM to a pipe. A reader thread turns every sampling
//! interval of audio into one RMS level and hands it to a single sink.
//! Any failure just ends the stream: the visualizer is never allowed to
//! disturb playback.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::level::{PCM16_WIDTH, rms_level};
use crate::external_tools;

pub const DECODE_SAMPLE_RATE: u32 = 8_000;
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Receives level samples, in production order, from exactly one worker.
pub type LevelSink = Box<dyn FnMut(f32) + Send + 'static>;

/// Which file to decode and where to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub path: PathBuf,
    pub start_ms: u64,
}

impl DecodeRequest {
    pub fn new(path: &Path, start_ms: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            start_ms,
        }
    }
}

/// A running producer of level samples.
pub trait LevelWorker {
    /// Stop producing. Once this returns the sink is never called again.
    fn stop(&mut self);
}

/// Creates workers for the visualization pipeline.
pub trait WorkerFactory {
    fn spawn(&self, request: DecodeRequest, sink: LevelSink) -> Box<dyn LevelWorker>;
}

#[derive(Debug, Clone)]
pub struct DecoderSettings {
    pub program: PathBuf,
    pub sample_rate: u32,
    /// Audio duration summarized by one level sample.
    pub interval: Duration,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            program: external_tools::ffmpeg_program(),
            sample_rate: DECODE_SAMPLE_RATE,
            interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

impl DecoderSettings {
    /// Bytes of PCM per level sample: 1600 for 100 ms at 8 kHz.
    pub fn chunk_bytes(&self) -> usize {
        let frames = self.sample_rate as u128 * self.interval.as_millis() / 1000;
        (frames as usize).max(1) * PCM16_WIDTH
    }

    fn command(&self, request: &DecodeRequest) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-nostdin")
            .args(["-hide_banner", "-loglevel", "quiet"])
            .arg("-ss")
            .arg(format_seek_seconds(request.start_ms))
            .arg("-i")
            .arg(&request.path)
            .args(["-vn", "-f", "s16le", "-acodec", "pcm_s16le", "-ac", "1"])
            .arg("-ar")
            .arg(self.sample_rate.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        external_tools::hide_console(&mut command);
        command
    }
}

fn format_seek_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Spawns [`DecodeWorker`]s with fixed settings.
#[derive(Debug, Clone, Default)]
pub struct FfmpegWorkerFactory {
    settings: DecoderSettings,
}

impl FfmpegWorkerFactory {
    pub fn new(settings: DecoderSettings) -> Self {
        Self { settings }
    }
}

impl WorkerFactory for FfmpegWorkerFactory {
    fn spawn(&self, request: DecodeRequest, sink: LevelSink) -> Box<dyn LevelWorker> {
        Box::new(DecodeWorker::start(&self.settings, request, sink))
    }
}

/// One decode child plus the thread draining its output.
pub struct DecodeWorker {
    stop_flag: Arc<AtomicBool>,
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    /// Launch the decoder for `request`.
    ///
    /// Never fails: if the program is missing or the pipe cannot be set up
    /// the returned worker is idle and the sink is simply never called.
    pub fn start(settings: &DecoderSettings, request: DecodeRequest, sink: LevelSink) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let idle = |stop_flag| Self {
            stop_flag,
            child: None,
            reader: None,
        };
        let mut child = match settings.command(&request).spawn() {
            Ok(child) => child,
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    tracing::debug!(
                        "Visualizer disabled: {} not found",
                        settings.program.display()
                    );
                } else {
                    tracing::warn!("Visualizer decode failed to start: {err}");
                }
                return idle(stop);
            }
        };
        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return idle(stop);
        };

        let chunk_bytes = settings.chunk_bytes();
        let thread_stop = Arc::clone(&stop);
        let spawned = thread::Builder::new()
            .name("viz-decode".to_string())
            .spawn(move || {
                let mut sink = sink;
                let delivered = pump_levels(stdout, chunk_bytes, &thread_stop, &mut sink);
                tracing::debug!("Visualizer stream ended after {delivered} samples");
            });
        match spawned {
            Ok(reader) => {
                tracing::debug!(
                    "Visualizer decoding {} from {} ms",
                    request.path.display(),
                    request.start_ms
                );
                Self {
                    stop_flag: stop,
                    child: Some(child),
                    reader: Some(reader),
                }
            }
            Err(err) => {
                tracing::warn!("Visualizer thread failed to start: {err}");
                reap(&mut child);
                idle(stop)
            }
        }
    }

    /// True while the reader thread is still draining the decoder.
    pub fn is_running(&self) -> bool {
        self.reader
            .as_ref()
            .is_some_and(|reader| !reader.is_finished())
    }
}

impl LevelWorker for DecodeWorker {
    /// Kill the decoder, join the reader and reap the child.
    ///
    /// Blocks for as long as the OS takes to tear the process down.
    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(child) = self.child.as_mut() {
            // Killing closes the pipe, which unblocks a reader stuck in `read`.
            let _ = child.kill();
        }
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            tracing::warn!("Visualizer reader thread panicked");
        }
        if let Some(mut child) = self.child.take() {
            reap(&mut child);
        }
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    if let Err(err) = child.wait() {
        tracing::debug!("Failed to reap visualizer decoder: {err}");
    }
}

/// Read `chunk_bytes` at a time from `source` and deliver one level per chunk
/// until end of stream, a read error, or `stop` is raised.
///
/// A short final chunk still yields a level. Returns the number delivered.
pub(crate) fn pump_levels(
    mut source: impl Read,
    chunk_bytes: usize,
    stop: &AtomicBool,
    sink: &mut LevelSink,
) -> usize {
    let mut chunk = vec![0u8; chunk_bytes.max(PCM16_WIDTH)];
    let mut delivered = 0;
    while !stop.load(Ordering::Acquire) {
        let filled = match fill_chunk(&mut source, &mut chunk) {
            Ok(filled) => filled,
            Err(err) => {
                tracing::debug!("Visualizer read failed: {err}");
                break;
            }
        };
        if filled == 0 || stop.load(Ordering::Acquire) {
            break;
        }
        sink(rms_level(&chunk[..filled], PCM16_WIDTH));
        delivered += 1;
        if filled < chunk.len() {
            break;
        }
    }
    delivered
}

/// Fill `chunk` completely unless the stream ends first.
fn fill_chunk(source: &mut impl Read, chunk: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        match source.read(&mut chunk[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
