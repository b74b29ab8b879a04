#![forbid(unsafe_code)]

pub mod chart;
pub mod encode_ffmpeg;
pub mod error;
pub mod input;
pub mod metric;
pub mod pipeline;
pub mod render;
pub mod resample;
pub mod stats;
mod text;
pub mod timebase;
pub mod viewport;

pub use chart::{ChartKind, ChartSpec, ExportOptions, RenderStyle, Resolution};
pub use encode_ffmpeg::{EncodeConfig, FfmpegEncoder};
pub use error::{ChartError, ChartResult};
pub use pipeline::{RunOptions, RunReport, run};
pub use render::{ChartData, FrameRgba, NullProgress, OUTPUT_FPS, ProgressSink};
pub use resample::{GRID_INTERVAL_MS, ResampledSeries};
pub use stats::SeriesSummary;
pub use timebase::Sample;
pub use viewport::{SCROLL_SAMPLES, ViewportWindow};
