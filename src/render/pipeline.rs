use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use rayon::prelude::*;

use crate::{
    foundation::error::{LakebloomError, LakebloomResult},
    raster::field::ConcentrationField,
    render::frame::{FrameRenderer, frame_file_name},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
/// Threading and chunking controls for multi-frame rendering.
pub struct RenderThreading {
    /// Enable parallel rendering when `true`.
    pub parallel: bool,
    /// Chunk size in frames for batched scheduling.
    pub chunk_size: usize,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 16,
            threads: None,
        }
    }
}

impl RenderThreading {
    /// Reject an explicit thread count of zero.
    pub fn validate(&self) -> LakebloomResult<()> {
        if let Some(n) = self.threads
            && n == 0
        {
            return Err(LakebloomError::invalid_parameter(
                "render threading 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
/// Aggregated rendering counters.
pub struct RenderStats {
    /// Frames written.
    pub frames_rendered: u64,
    /// Wall time of the slowest frame, in milliseconds.
    pub slowest_frame_ms: u64,
}

/// Render `fields` into `out_dir`, one `spatial_<index>.png` per field.
///
/// Frame `i` of the slice is written as index `i`, so the returned paths are in input order and
/// their lexical order matches it. When `frame_deadline` is set, a frame that takes longer fails
/// the whole call with [`LakebloomError::Timeout`].
#[tracing::instrument(
    skip(renderer, fields, threading),
    fields(frames = fields.len(), out_dir = %out_dir.display())
)]
pub fn render_frames(
    renderer: &FrameRenderer,
    fields: &[ConcentrationField],
    out_dir: &Path,
    threading: &RenderThreading,
    frame_deadline: Option<Duration>,
) -> LakebloomResult<(Vec<PathBuf>, RenderStats)> {
    threading.validate()?;

    let render_one = |index: usize, field: &ConcentrationField| -> LakebloomResult<(PathBuf, u64)> {
        let started = Instant::now();
        let path = renderer.render(field, index, out_dir)?;
        let elapsed = started.elapsed();
        if let Some(limit) = frame_deadline
            && elapsed > limit
        {
            return Err(LakebloomError::timeout(format!(
                "frame {} ({}) took {} ms, over the {} ms deadline",
                index,
                frame_file_name(index),
                elapsed.as_millis(),
                limit.as_millis()
            )));
        }
        Ok((path, elapsed.as_millis() as u64))
    };

    let results: Vec<(PathBuf, u64)> = if !threading.parallel {
        fields
            .iter()
            .enumerate()
            .map(|(i, f)| render_one(i, f))
            .collect::<LakebloomResult<_>>()?
    } else {
        let pool = build_thread_pool(threading.threads)?;
        let chunk_size = normalized_chunk_size(threading.chunk_size);
        let mut out = Vec::with_capacity(fields.len());
        for (c, chunk) in fields.chunks(chunk_size).enumerate() {
            let base = c * chunk_size;
            let rendered = pool.install(|| {
                chunk
                    .par_iter()
                    .enumerate()
                    .map(|(j, f)| render_one(base + j, f))
                    .collect::<LakebloomResult<Vec<_>>>()
            })?;
            out.extend(rendered);
        }
        out
    };

    let mut stats = RenderStats::default();
    let mut paths = Vec::with_capacity(results.len());
    for (path, ms) in results {
        stats.frames_rendered += 1;
        stats.slowest_frame_ms = stats.slowest_frame_ms.max(ms);
        paths.push(path);
    }
    tracing::info!(
        frames = stats.frames_rendered,
        slowest_ms = stats.slowest_frame_ms,
        "frames rendered"
    );
    Ok((paths, stats))
}

/// Build a rayon pool with `threads` workers, or rayon's default when unset.
pub fn build_thread_pool(threads: Option<usize>) -> LakebloomResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(LakebloomError::invalid_parameter(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| LakebloomError::render(format!("failed to build rayon thread pool: {e}")))
}

fn normalized_chunk_size(chunk_size: usize) -> usize {
    chunk_size.max(1)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
