use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    encode::assemble::AssembleOpts,
    foundation::core::Fps,
    foundation::error::{LakebloomError, LakebloomResult},
    raster::field::RasterParams,
    raster::grid::CoordinateGrid,
    render::chart::TrendChartOpts,
    render::frame::FrameStyle,
    render::pipeline::RenderThreading,
    series::synth::SeriesParams,
};

/// Where each stage reads and writes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelinePaths {
    /// Monthly series CSV; synthesized here when absent.
    pub series: PathBuf,
    /// Trend chart PNG.
    pub trend: PathBuf,
    /// Directory of `spatial_<index>.png` frames.
    pub frames_dir: PathBuf,
    /// Encoded video.
    pub video: PathBuf,
    /// Run manifest; next to the video when unset.
    pub manifest: Option<PathBuf>,
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self {
            series: PathBuf::from("LakeVictoria_Monthly_Chla_TimeSeries.csv"),
            trend: PathBuf::from("outputs/figures/trend_plot.png"),
            frames_dir: PathBuf::from("spatial_frames"),
            video: PathBuf::from("output/lake_victoria_eutrophication.mp4"),
            manifest: None,
        }
    }
}

impl PipelinePaths {
    /// Manifest location: the explicit path, or `manifest.json` beside the video.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest.clone().unwrap_or_else(|| {
            self.video
                .parent()
                .map(|p| p.join("manifest.json"))
                .unwrap_or_else(|| PathBuf::from("manifest.json"))
        })
    }
}

/// Whole-run configuration, loadable from JSON.
///
/// Every section defaults independently, so a file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stage inputs and outputs.
    pub paths: PipelinePaths,
    /// Synthetic series generator.
    pub series: SeriesParams,
    /// Domain, sampling, and bloom kernel.
    pub raster: RasterParams,
    /// Frame look, including the fixed display range.
    pub frame: FrameStyle,
    /// Trend chart look and threshold.
    pub chart: TrendChartOpts,
    /// Video frame rate.
    pub fps: Fps,
    /// Render one frame every this many months of the series.
    pub frame_step_months: usize,
    /// Keep frames already present in `frames_dir` instead of re-rendering.
    pub reuse_frames: bool,
    /// Field synthesis and frame rendering parallelism.
    pub threading: RenderThreading,
    /// Fail a frame that renders for longer than this.
    #[serde(with = "crate::foundation::core::optional_millis")]
    pub frame_deadline: Option<Duration>,
    /// Video backend, strictness, and encode deadline.
    pub assemble: AssembleOpts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PipelinePaths::default(),
            series: SeriesParams::default(),
            raster: RasterParams::default(),
            frame: FrameStyle::default(),
            chart: TrendChartOpts::default(),
            fps: Fps::default(),
            frame_step_months: 6,
            reuse_frames: false,
            threading: RenderThreading::default(),
            frame_deadline: None,
            assemble: AssembleOpts::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> LakebloomResult<Self> {
        serde_json::from_reader(r).map_err(|e| {
            LakebloomError::invalid_parameter(format!("parse pipeline config JSON: {e}"))
        })
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> LakebloomResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LakebloomError::not_found(path));
        }
        let f = File::open(path).map_err(|e| {
            LakebloomError::invalid_parameter(format!(
                "open pipeline config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_reader(BufReader::new(f)).map_err(|e| match e {
            LakebloomError::InvalidParameter(msg) => {
                LakebloomError::invalid_parameter(format!("{msg} (in '{}')", path.display()))
            }
            other => other,
        })
    }

    /// Check every section before any stage runs.
    pub fn validate(&self) -> LakebloomResult<()> {
        self.series.validate()?;
        self.raster.kernel.validate()?;
        CoordinateGrid::new(self.raster.bbox, self.raster.grid)?;
        self.frame.validate()?;
        if self.chart.window == 0 {
            return Err(LakebloomError::invalid_parameter(
                "chart window must be >= 1, got 0",
            ));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.frame_step_months == 0 {
            return Err(LakebloomError::invalid_parameter(
                "frame_step_months must be >= 1, got 0",
            ));
        }
        self.threading.validate()?;
        if self.paths.frames_dir.as_os_str().is_empty() {
            return Err(LakebloomError::invalid_parameter("paths.frames_dir is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
