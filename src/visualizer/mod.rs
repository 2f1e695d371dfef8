//! Live level visualizer for the playing title.

mod level;
mod pipeline;
mod ring_buffer;
mod worker;

pub use level::{PCM16_WIDTH, rms_level};
pub use pipeline::{RenderMode, VisualizationPipeline, render_levels};
pub use ring_buffer::{LEVEL_HISTORY_LEN, RingBuffer};
pub use worker::{
    DECODE_SAMPLE_RATE, DEFAULT_SAMPLE_INTERVAL, DecodeRequest, DecodeWorker, DecoderSettings,
    FfmpegWorkerFactory, LevelSink, LevelWorker, WorkerFactory,
};
