use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
use crate::encode::gif::GifSink;
use crate::encode::sink::{SinkConfig, VideoSink};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LakebloomError, LakebloomResult};
use crate::foundation::fs::{TempFileGuard, ensure_parent_dir, partial_path};
use crate::render::svg::FrameRGBA;

/// Frame file extensions picked up by [`list_frames`], compared case-insensitively.
pub const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// How an unusable encoding backend is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Fail with [`LakebloomError::BackendUnavailable`].
    Strict,
    /// Log a warning and produce no artifact.
    #[default]
    Lenient,
}

/// Video encoder used by [`VideoAssembler`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum VideoBackend {
    /// System `ffmpeg`, H.264 in an MP4 container.
    #[default]
    Ffmpeg,
    /// Animated GIF written in-process.
    Gif,
}

impl VideoBackend {
    /// Whether this backend can run on the current host.
    pub fn is_available(self) -> bool {
        match self {
            Self::Ffmpeg => is_ffmpeg_on_path(),
            Self::Gif => true,
        }
    }

    /// Whether frames must have even width and height.
    pub fn requires_even_dimensions(self) -> bool {
        matches!(self, Self::Ffmpeg)
    }

    fn sink(self, out_path: &Path, final_path: &Path, opts: &AssembleOpts) -> Box<dyn VideoSink> {
        match self {
            Self::Ffmpeg => Box::new(FfmpegSink::new(FfmpegSinkOpts {
                out_path: out_path.to_path_buf(),
                bg_rgb: opts.bg_rgb,
                timeout: opts.encode_timeout,
                ..FfmpegSinkOpts::new(final_path)
            })),
            Self::Gif => Box::new(GifSink::new(out_path).with_background(opts.bg_rgb)),
        }
    }
}

/// Assembly settings fixed for a run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssembleOpts {
    /// Encoder to use.
    pub backend: VideoBackend,
    /// Reaction to an unavailable backend.
    pub strictness: Strictness,
    /// Kill the encoder and fail after this long.
    #[serde(with = "crate::foundation::core::optional_millis")]
    pub encode_timeout: Option<Duration>,
    /// Background that transparent frame pixels are flattened onto.
    pub bg_rgb: [u8; 3],
}

impl Default for AssembleOpts {
    fn default() -> Self {
        Self {
            backend: VideoBackend::default(),
            strictness: Strictness::default(),
            encode_timeout: None,
            bg_rgb: [0, 0, 0],
        }
    }
}

/// Encoded video plus what went into it.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VideoArtifact {
    /// Output file.
    pub path: PathBuf,
    /// Number of frames encoded.
    pub frames: usize,
    /// Frame rate.
    pub fps: Fps,
    /// Codec identifier, e.g. `libx264` or `gif`.
    pub codec: String,
    /// Frame size in pixels.
    pub width: u32,
    /// Frame size in pixels.
    pub height: u32,
}

/// Sorted frame files in `dir` with a [`FRAME_EXTENSIONS`] extension.
///
/// Missing directory is [`LakebloomError::NotFound`]; an empty listing is returned as-is.
pub fn list_frames(dir: &Path) -> LakebloomResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(LakebloomError::not_found(dir));
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list frames in '{}'", dir.display()))?;

    let mut frames = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list frames in '{}'", dir.display()))?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FRAME_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if matches && path.is_file() {
            frames.push(path);
        }
    }
    frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(frames)
}

/// Turns a directory of ordered frames into one video.
#[derive(Clone, Debug, Default)]
pub struct VideoAssembler {
    opts: AssembleOpts,
}

impl VideoAssembler {
    /// Assembler with fixed settings.
    pub fn new(opts: AssembleOpts) -> Self {
        Self { opts }
    }

    /// Settings in use.
    pub fn opts(&self) -> &AssembleOpts {
        &self.opts
    }

    /// Encode the frames in `frames_dir` into `out_path` at `fps`.
    ///
    /// Input checks run before any encoder starts: a missing directory, an empty directory, and an
    /// unreadable or differently sized frame are hard errors in both strictness modes. An
    /// unavailable backend is an error when strict and `Ok(None)` when lenient. Output goes to a
    /// `.partial` sibling that is renamed on success, so a failed encode leaves `out_path` absent.
    #[tracing::instrument(
        skip(self),
        fields(backend = ?self.opts.backend, strictness = ?self.opts.strictness)
    )]
    pub fn assemble(
        &self,
        frames_dir: &Path,
        out_path: &Path,
        fps: Fps,
    ) -> LakebloomResult<Option<VideoArtifact>> {
        Fps::new(fps.num, fps.den)?;

        let frames = list_frames(frames_dir)?;
        if frames.is_empty() {
            return Err(LakebloomError::empty_input(format!(
                "no {} frames found in '{}'",
                FRAME_EXTENSIONS.join("/"),
                frames_dir.display()
            )));
        }
        let (width, height) = probe_frames(&frames, self.opts.backend)?;

        let backend = self.opts.backend;
        if !backend.is_available() {
            let msg = format!(
                "{backend:?} backend is not available; cannot encode {} frames into '{}'",
                frames.len(),
                out_path.display()
            );
            return match self.opts.strictness {
                Strictness::Strict => Err(LakebloomError::backend_unavailable(msg)),
                Strictness::Lenient => {
                    tracing::warn!("{msg}; skipping video assembly");
                    Ok(None)
                }
            };
        }

        ensure_parent_dir(out_path)?;
        let tmp = partial_path(out_path);
        let mut guard = TempFileGuard(Some(tmp.clone()));

        let mut sink = backend.sink(&tmp, out_path, &self.opts);
        let codec = sink.codec().to_string();
        sink.begin(SinkConfig { width, height, fps })?;
        for (i, path) in frames.iter().enumerate() {
            let frame = load_frame(path)?;
            sink.push_frame(FrameIndex(i as u64), &frame)?;
        }
        sink.end()?;
        drop(sink);

        std::fs::rename(&tmp, out_path).with_context(|| {
            format!(
                "failed to move '{}' into place at '{}'",
                tmp.display(),
                out_path.display()
            )
        })?;
        guard.disarm();

        tracing::info!(
            frames = frames.len(),
            path = %out_path.display(),
            codec = %codec,
            "video assembled"
        );
        Ok(Some(VideoArtifact {
            path: out_path.to_path_buf(),
            frames: frames.len(),
            fps,
            codec,
            width,
            height,
        }))
    }
}

/// Read every frame header; all frames must decode and share the first frame's size.
fn probe_frames(frames: &[PathBuf], backend: VideoBackend) -> LakebloomResult<(u32, u32)> {
    let mut size = None;
    for path in frames {
        let dims = image::image_dimensions(path).map_err(|e| {
            LakebloomError::malformed_frame(format!(
                "'{}' is not a readable image: {e}",
                path.display()
            ))
        })?;
        match size {
            None => size = Some(dims),
            Some(first) if first != dims => {
                return Err(LakebloomError::malformed_frame(format!(
                    "'{}' is {}x{}, expected {}x{} like the first frame",
                    path.display(),
                    dims.0,
                    dims.1,
                    first.0,
                    first.1
                )));
            }
            Some(_) => {}
        }
    }
    let (width, height) = size.ok_or_else(|| LakebloomError::empty_input("no frames to probe"))?;
    if backend.requires_even_dimensions() && (width % 2 != 0 || height % 2 != 0) {
        return Err(LakebloomError::malformed_frame(format!(
            "frames are {width}x{height}; {backend:?} output needs even width and height"
        )));
    }
    Ok((width, height))
}

/// Decode a frame file into premultiplied RGBA8.
fn load_frame(path: &Path) -> LakebloomResult<FrameRGBA> {
    let img = image::open(path)
        .map_err(|e| {
            LakebloomError::malformed_frame(format!("cannot decode '{}': {e}", path.display()))
        })?
        .into_rgba8();
    let (width, height) = img.dimensions();
    let mut data = img.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a < 255 {
            for c in &mut px[..3] {
                *c = crate::foundation::math::mul_div255_u16(u16::from(*c), a) as u8;
            }
        }
    }
    Ok(FrameRGBA {
        width,
        height,
        data,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/assemble.rs"]
mod tests;
