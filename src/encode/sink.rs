use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LakebloomError, LakebloomResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::svg::FrameRGBA;

/// Configuration provided to a [`VideoSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
}

impl SinkConfig {
    /// Reject zero sizes and zero rates.
    pub fn validate(&self) -> LakebloomResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(LakebloomError::invalid_parameter("fps must be non-zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(LakebloomError::invalid_parameter(
                "video sink width/height must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Sink contract for consuming frames in sequence order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, between
/// one `begin` and one `end`.
pub trait VideoSink: Send {
    /// Codec identifier recorded on the resulting artifact.
    fn codec(&self) -> &'static str;
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> LakebloomResult<()>;
    /// Push one frame in strictly increasing order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LakebloomResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> LakebloomResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    finished: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// `true` once `end` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl VideoSink for InMemorySink {
    fn codec(&self) -> &'static str {
        "raw"
    }

    fn begin(&mut self, cfg: SinkConfig) -> LakebloomResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LakebloomResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| LakebloomError::encode("in-memory sink not started"))?;
        check_frame(cfg, self.frames.last().map(|(i, _)| *i), idx, frame)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> LakebloomResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Shared ordering and size checks for `push_frame`.
pub(crate) fn check_frame(
    cfg: &SinkConfig,
    last: Option<FrameIndex>,
    idx: FrameIndex,
    frame: &FrameRGBA,
) -> LakebloomResult<()> {
    if let Some(last) = last
        && idx.0 <= last.0
    {
        return Err(LakebloomError::encode(format!(
            "sink received out-of-order frame index {} after {}",
            idx.0, last.0
        )));
    }
    if frame.width != cfg.width || frame.height != cfg.height {
        return Err(LakebloomError::malformed_frame(format!(
            "frame {} size mismatch: got {}x{}, expected {}x{}",
            idx.0, frame.width, frame.height, cfg.width, cfg.height
        )));
    }
    if frame.data.len() != (cfg.width as usize) * (cfg.height as usize) * 4 {
        return Err(LakebloomError::malformed_frame(format!(
            "frame {} data size mismatch with width*height*4",
            idx.0
        )));
    }
    Ok(())
}

/// Flatten premultiplied RGBA8 over an opaque background color.
pub(crate) fn flatten_premul_over_bg(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgb: [u8; 3],
) -> LakebloomResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(LakebloomError::encode(
            "flatten_premul_over_bg expects equal-length rgba8 buffers",
        ));
    }

    let bg = bg_rgb.map(u16::from);
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
