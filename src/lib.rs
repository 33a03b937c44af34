//! Lakebloom turns a monthly chlorophyll-a series into a spatial bloom narrative.
//!
//! A run loads (or synthesizes) the lake-wide monthly series, draws its trend chart, synthesizes
//! one concentration field per sampled month, renders each field as a labelled PNG frame, and
//! assembles the frames into a video:
//!
//! - [`load_or_synthesize`] and [`synthesize_series`] for the series
//! - [`RasterSynthesizer`] for the fields
//! - [`FrameRenderer`] and [`render_frames`] for the frames
//! - [`VideoAssembler`] for the video
//! - [`run_pipeline`] for all of the above in order
//!
//! Synthetic data is demo material only and every artifact built from it is marked as such.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Video assembly and sinks.
pub mod encode;
mod foundation;
/// Stage orchestration.
pub mod pipeline;
/// Concentration fields.
pub mod raster;
/// Frames and charts.
pub mod render;
/// Monthly series.
pub mod series;

pub use crate::foundation::core::{
    Fps, FrameIndex, GeoBoundingBox, GeoPoint, GridShape, ValueRange, month_label, month_range,
};
pub use crate::foundation::error::{LakebloomError, LakebloomResult};
pub use crate::foundation::math::derive_seed;

pub use crate::encode::assemble::{
    AssembleOpts, Strictness, VideoArtifact, VideoAssembler, VideoBackend, list_frames,
};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::gif::GifSink;
pub use crate::encode::sink::{InMemorySink, SinkConfig, VideoSink};
pub use crate::pipeline::config::{PipelineConfig, PipelinePaths};
pub use crate::pipeline::run::{RunManifest, RunReport, run_pipeline};
pub use crate::raster::field::{
    BloomKernelParams, ConcentrationField, RasterParams, RasterSynthesizer, time_fraction,
};
pub use crate::raster::grid::CoordinateGrid;
pub use crate::render::chart::{TrendChartOpts, render_trend_chart};
pub use crate::render::colormap::{CHLA_PALETTE, ColorScale};
pub use crate::render::frame::{FrameRenderer, FrameStyle, frame_file_name};
pub use crate::render::pipeline::{RenderStats, RenderThreading, render_frames};
pub use crate::render::svg::FrameRGBA;
pub use crate::series::record::{TimeSeriesRecord, sample_timestamps};
pub use crate::series::stats::{EUTROPHIC_THRESHOLD, SeriesSummary, moving_average, summarize};
pub use crate::series::store::{
    LoadedSeries, SeriesOrigin, load_or_synthesize, read_series_csv, synthetic_marker_path,
    write_series_csv,
};
pub use crate::series::synth::{SeriesParams, synthesize_components, synthesize_series};
