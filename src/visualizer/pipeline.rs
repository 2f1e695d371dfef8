use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::ring_buffer::RingBuffer;
use super::worker::{DecodeRequest, FfmpegWorkerFactory, LevelSink, LevelWorker, WorkerFactory};

/// Radius of a silent point in the radial view.
const RADIAL_BASE: f32 = 0.5;

/// How the level window is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Waveform,
    Bars,
    Radial,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [Self::Waveform, Self::Bars, Self::Radial];

    pub fn label(self) -> &'static str {
        match self {
            Self::Waveform => "Wave",
            Self::Bars => "Bars",
            Self::Radial => "Circle",
        }
    }

    /// The mode after this one, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Self::Waveform => Self::Bars,
            Self::Bars => Self::Radial,
            Self::Radial => Self::Waveform,
        }
    }
}

impl std::str::FromStr for RenderMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wave" | "waveform" => Ok(Self::Waveform),
            "bars" | "bar" => Ok(Self::Bars),
            "circle" | "radial" => Ok(Self::Radial),
            other => Err(format!("Unknown visualizer mode: {other}")),
        }
    }
}

/// Owns the level window and the single decode worker feeding it.
///
/// A new worker is only spawned after the previous one has fully stopped, so
/// the window never mixes levels from two offsets. The window itself is
/// shared with the worker's sink behind a mutex.
pub struct VisualizationPipeline {
    levels: Arc<Mutex<RingBuffer<f32>>>,
    factory: Box<dyn WorkerFactory>,
    active: Option<Box<dyn LevelWorker>>,
    current_file: Option<PathBuf>,
    mode: RenderMode,
}

impl VisualizationPipeline {
    pub fn new(factory: Box<dyn WorkerFactory>) -> Self {
        Self {
            levels: Arc::new(Mutex::new(RingBuffer::default())),
            factory,
            active: None,
            current_file: None,
            mode: RenderMode::default(),
        }
    }

    /// Pipeline backed by `ffmpeg` with default decoder settings.
    pub fn with_ffmpeg() -> Self {
        Self::new(Box::new(FfmpegWorkerFactory::default()))
    }

    /// Stop any running worker, then start one decoding `file` from `offset_ms`.
    ///
    /// Switching to a different file also resets the window to silence.
    pub fn start(&mut self, file: &Path, offset_ms: u64) {
        self.stop();
        if self.current_file.as_deref() != Some(file) {
            self.lock_levels().clear();
            self.current_file = Some(file.to_path_buf());
        }
        let levels = Arc::clone(&self.levels);
        let sink: LevelSink = Box::new(move |level| {
            levels
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(level);
        });
        self.active = Some(self.factory.spawn(DecodeRequest::new(file, offset_ms), sink));
    }

    /// Same as [`start`](Self::start); used after every seek, skip, chapter
    /// jump and resume so the window follows the playhead.
    pub fn restart(&mut self, file: &Path, offset_ms: u64) {
        self.start(file, offset_ms);
    }

    /// Stop the running worker, if any. Blocks until it has exited.
    pub fn stop(&mut self) {
        if let Some(mut worker) = self.active.take() {
            worker.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    /// Current window, oldest level first.
    pub fn levels(&self) -> Vec<f32> {
        self.lock_levels().snapshot()
    }

    /// Points for the current mode.
    pub fn render(&self) -> Vec<[f32; 2]> {
        self.render_sample(self.mode)
    }

    /// Points for `mode` computed from the latest full window.
    ///
    /// Pure with respect to pipeline state; safe to call at any cadence.
    pub fn render_sample(&self, mode: RenderMode) -> Vec<[f32; 2]> {
        render_levels(&self.levels(), mode)
    }

    fn lock_levels(&self) -> std::sync::MutexGuard<'_, RingBuffer<f32>> {
        self.levels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for VisualizationPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Map a level window onto plot points.
///
/// Waveform and bars both plot `(index, level)`; they differ only in how the
/// renderer draws them. Radial spreads the window evenly over a full turn
/// with radius `0.5 + level`.
pub fn render_levels(levels: &[f32], mode: RenderMode) -> Vec<[f32; 2]> {
    match mode {
        RenderMode::Waveform | RenderMode::Bars => levels
            .iter()
            .enumerate()
            .map(|(index, &level)| [index as f32, level])
            .collect(),
        RenderMode::Radial => {
            let step = TAU / levels.len().max(1) as f32;
            levels
                .iter()
                .enumerate()
                .map(|(index, &level)| {
                    let (sin, cos) = (index as f32 * step).sin_cos();
                    let radius = RADIAL_BASE + level;
                    [radius * cos, radius * sin]
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::LEVEL_HISTORY_LEN;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Started(usize, PathBuf, u64),
        Stopped(usize),
    }

    type Emitter = Arc<Mutex<Option<LevelSink>>>;

    #[derive(Default, Clone)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
        emitters: Arc<Mutex<Vec<Emitter>>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn live_workers(&self) -> usize {
            let mut live = 0i64;
            for event in self.events() {
                match event {
                    Event::Started(..) => live += 1,
                    Event::Stopped(_) => live -= 1,
                }
            }
            live as usize
        }

        /// Push `level` through worker `id`'s sink, if it is still attached.
        fn emit(&self, id: usize, level: f32) {
            let emitter = Arc::clone(&self.emitters.lock().unwrap()[id - 1]);
            if let Some(sink) = emitter.lock().unwrap().as_mut() {
                sink(level);
            }
        }
    }

    struct FakeWorker {
        id: usize,
        sink: Emitter,
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl LevelWorker for FakeWorker {
        fn stop(&mut self) {
            self.sink.lock().unwrap().take();
            self.events.lock().unwrap().push(Event::Stopped(self.id));
        }
    }

    impl WorkerFactory for Recorder {
        fn spawn(&self, request: DecodeRequest, sink: LevelSink) -> Box<dyn LevelWorker> {
            let emitter = Arc::new(Mutex::new(Some(sink)));
            let mut emitters = self.emitters.lock().unwrap();
            emitters.push(Arc::clone(&emitter));
            let id = emitters.len();
            self.events
                .lock()
                .unwrap()
                .push(Event::Started(id, request.path, request.start_ms));
            Box::new(FakeWorker {
                id,
                sink: emitter,
                events: Arc::clone(&self.events),
            })
        }
    }

    fn pipeline() -> (VisualizationPipeline, Recorder) {
        let recorder = Recorder::default();
        (VisualizationPipeline::new(Box::new(recorder.clone())), recorder)
    }

    #[test]
    fn start_while_active_stops_old_worker_first() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.start(Path::new("/a.m4b"), 0);
        pipeline.start(Path::new("/a.m4b"), 30_000);
        assert_eq!(
            recorder.events(),
            vec![
                Event::Started(1, PathBuf::from("/a.m4b"), 0),
                Event::Stopped(1),
                Event::Started(2, PathBuf::from("/a.m4b"), 30_000),
            ]
        );
        assert_eq!(recorder.live_workers(), 1);
    }

    #[test]
    fn restart_keeps_exactly_one_worker_alive() {
        let (mut pipeline, recorder) = pipeline();
        for offset in [0, 10_000, 20_000, 5_000] {
            pipeline.restart(Path::new("/a.m4b"), offset);
            assert_eq!(recorder.live_workers(), 1);
        }
        pipeline.stop();
        assert_eq!(recorder.live_workers(), 0);
        assert!(!pipeline.is_active());
    }

    #[test]
    fn stop_without_worker_is_a_no_op() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.stop();
        pipeline.stop();
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn samples_flow_into_window_and_stale_worker_is_cut_off() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.start(Path::new("/a.m4b"), 0);
        recorder.emit(1, 0.25);
        recorder.emit(1, 0.75);
        let levels = pipeline.levels();
        assert_eq!(levels.len(), LEVEL_HISTORY_LEN);
        assert_eq!(&levels[LEVEL_HISTORY_LEN - 2..], &[0.25, 0.75]);

        pipeline.restart(Path::new("/a.m4b"), 60_000);
        recorder.emit(1, 0.99);
        assert_eq!(*pipeline.levels().last().unwrap(), 0.75);
        recorder.emit(2, 0.5);
        assert_eq!(*pipeline.levels().last().unwrap(), 0.5);
    }

    #[test]
    fn switching_files_resets_window() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.start(Path::new("/a.m4b"), 0);
        recorder.emit(1, 0.8);
        pipeline.start(Path::new("/b.m4b"), 0);
        assert!(pipeline.levels().iter().all(|&level| level == 0.0));
    }

    #[test]
    fn dropping_pipeline_stops_worker() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.start(Path::new("/a.m4b"), 0);
        drop(pipeline);
        assert_eq!(recorder.live_workers(), 0);
    }

    #[test]
    fn waveform_and_bars_plot_index_against_level() {
        let levels = [0.0, 0.5, 1.0];
        let expected = vec![[0.0, 0.0], [1.0, 0.5], [2.0, 1.0]];
        assert_eq!(render_levels(&levels, RenderMode::Waveform), expected);
        assert_eq!(render_levels(&levels, RenderMode::Bars), expected);
    }

    #[test]
    fn radial_places_points_evenly_around_circle() {
        let points = render_levels(&[0.0, 0.5, 0.0, 0.5], RenderMode::Radial);
        let expected = [[0.5, 0.0], [0.0, 1.0], [-0.5, 0.0], [0.0, -1.0]];
        for (point, want) in points.iter().zip(expected) {
            assert!((point[0] - want[0]).abs() < 1e-5, "{point:?} vs {want:?}");
            assert!((point[1] - want[1]).abs() < 1e-5, "{point:?} vs {want:?}");
        }
    }

    #[test]
    fn render_sample_always_sees_full_window() {
        let (pipeline, _recorder) = pipeline();
        for mode in RenderMode::ALL {
            assert_eq!(pipeline.render_sample(mode).len(), LEVEL_HISTORY_LEN);
        }
    }

    #[test]
    fn modes_cycle_and_parse() {
        assert_eq!(RenderMode::Radial.next(), RenderMode::Waveform);
        assert_eq!("Circle".parse::<RenderMode>(), Ok(RenderMode::Radial));
        assert!("sparkles".parse::<RenderMode>().is_err());
    }
}
