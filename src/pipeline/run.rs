use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    encode::assemble::{Strictness, VideoArtifact, VideoAssembler, VideoBackend, list_frames},
    foundation::core::Fps,
    foundation::error::{LakebloomError, LakebloomResult},
    foundation::fs::write_atomically,
    pipeline::config::PipelineConfig,
    raster::field::RasterSynthesizer,
    render::chart::{TrendChartOpts, render_trend_chart},
    render::frame::{FRAME_PREFIX, FrameRenderer},
    render::pipeline::{RenderStats, build_thread_pool, render_frames},
    series::record::sample_timestamps,
    series::stats::{SeriesSummary, summarize},
    series::store::{SeriesOrigin, load_or_synthesize},
};

/// JSON record of one pipeline run, written next to the video.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunManifest {
    /// Crate version that produced the run.
    pub generator: String,
    /// Series file read or written.
    pub series_path: PathBuf,
    /// Whether the series was loaded or synthesized.
    pub series_origin: SeriesOrigin,
    /// `true` when the series is demo data; the trend chart carries the marker.
    pub series_synthetic: bool,
    /// `true` when the frames and video show modelled fields rather than measured rasters.
    pub frames_synthetic: bool,
    /// Whole-series statistics.
    pub summary: SeriesSummary,
    /// Trend chart written.
    pub trend_path: PathBuf,
    /// Frame directory assembled.
    pub frames_dir: PathBuf,
    /// Frames in `frames_dir` at assembly time.
    pub frames: usize,
    /// `true` when existing frames were kept instead of re-rendered.
    pub frames_reused: bool,
    /// Video frame rate.
    pub fps: Fps,
    /// Backend requested.
    pub backend: VideoBackend,
    /// Strictness requested.
    pub strictness: Strictness,
    /// Encoded video, or `None` when a lenient run skipped assembly.
    pub video: Option<VideoArtifact>,
}

/// Outcome of [`run_pipeline`].
#[derive(Clone, Debug)]
pub struct RunReport {
    /// What was written to the manifest.
    pub manifest: RunManifest,
    /// Where the manifest was written.
    pub manifest_path: PathBuf,
    /// Rendering counters, when frames were rendered this run.
    pub render_stats: Option<RenderStats>,
}

/// Run every stage in order: series, trend chart, fields and frames, video, manifest.
#[tracing::instrument(skip(cfg))]
pub fn run_pipeline(cfg: &PipelineConfig) -> LakebloomResult<RunReport> {
    cfg.validate()?;
    let paths = &cfg.paths;

    let series = load_or_synthesize(&paths.series, &cfg.series)?;
    let series_synthetic = series.is_synthetic();
    // Every field comes from RasterSynthesizer; measured rasters are never ingested.
    let frames_synthetic = true;
    let summary = summarize(&series.records, cfg.chart.threshold)?;
    tracing::info!(
        months = summary.months,
        mean = summary.mean,
        slope_per_year = summary.slope_per_year,
        bloom_frequency_pct = summary.bloom_frequency_pct,
        series_synthetic,
        "series summary"
    );

    render_trend_chart(
        &series.records,
        &TrendChartOpts {
            synthetic: series_synthetic,
            ..cfg.chart.clone()
        },
        &paths.trend,
    )?;

    let existing = existing_frames(&paths.frames_dir)?;
    let (frames_reused, render_stats) = if cfg.reuse_frames && !existing.is_empty() {
        tracing::info!(
            frames = existing.len(),
            dir = %paths.frames_dir.display(),
            "reusing existing frames"
        );
        (true, None)
    } else {
        let timestamps = sample_timestamps(&series.records, cfg.frame_step_months)?;
        let synth = RasterSynthesizer::new(&cfg.raster)?;
        let fields = if cfg.threading.parallel {
            build_thread_pool(cfg.threading.threads)?.install(|| synth.synthesize_par(&timestamps))?
        } else {
            synth.synthesize(&timestamps)?
        };

        let renderer =
            FrameRenderer::new(cfg.frame.clone())?.with_synthetic_marker(frames_synthetic);
        let (written, stats) = render_frames(
            &renderer,
            &fields,
            &paths.frames_dir,
            &cfg.threading,
            cfg.frame_deadline,
        )?;
        remove_stale_frames(&existing, &written)?;
        (false, Some(stats))
    };

    let frames = list_frames(&paths.frames_dir)?.len();
    let video = VideoAssembler::new(cfg.assemble.clone()).assemble(
        &paths.frames_dir,
        &paths.video,
        cfg.fps,
    )?;

    let manifest = RunManifest {
        generator: format!("lakebloom {}", env!("CARGO_PKG_VERSION")),
        series_path: series.path.clone(),
        series_origin: series.origin,
        series_synthetic,
        frames_synthetic,
        summary,
        trend_path: paths.trend.clone(),
        frames_dir: paths.frames_dir.clone(),
        frames,
        frames_reused,
        fps: cfg.fps,
        backend: cfg.assemble.backend,
        strictness: cfg.assemble.strictness,
        video,
    };
    let manifest_path = paths.manifest_path();
    write_manifest(&manifest_path, &manifest)?;

    Ok(RunReport {
        manifest,
        manifest_path,
        render_stats,
    })
}

/// Serialize `manifest` as pretty JSON at `path`.
pub fn write_manifest(path: &Path, manifest: &RunManifest) -> LakebloomResult<()> {
    let json = serde_json::to_string_pretty(manifest).map_err(|e| {
        LakebloomError::Other(anyhow::Error::new(e).context("serialize run manifest"))
    })?;
    write_atomically(path, |tmp| {
        std::fs::write(tmp, json.as_bytes())
            .with_context(|| format!("failed to write '{}'", tmp.display()))?;
        Ok(())
    })?;
    tracing::info!(path = %path.display(), "manifest written");
    Ok(())
}

fn existing_frames(dir: &Path) -> LakebloomResult<Vec<PathBuf>> {
    if dir.is_dir() {
        list_frames(dir)
    } else {
        Ok(Vec::new())
    }
}

/// Delete frames from an earlier run that this run did not overwrite.
///
/// Only files carrying the frame prefix are touched.
fn remove_stale_frames(before: &[PathBuf], written: &[PathBuf]) -> LakebloomResult<()> {
    for path in before {
        let ours = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(FRAME_PREFIX));
        if ours && !written.contains(path) {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to remove stale frame '{}'", path.display()))?;
            tracing::debug!(path = %path.display(), "removed stale frame");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/run.rs"]
mod tests;
