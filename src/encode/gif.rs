use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

use crate::encode::sink::{SinkConfig, VideoSink, check_frame, flatten_premul_over_bg};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LakebloomError, LakebloomResult};
use crate::foundation::fs::ensure_parent_dir;
use crate::render::svg::FrameRGBA;

/// Codec identifier of [`GifSink`] output.
pub const GIF_CODEC: &str = "gif";

/// Output file that remembers its first IO error.
///
/// The GIF trailer and the buffered tail are written while the encoder drops, where errors are
/// discarded; the sink reads them back from here.
struct CheckedFile {
    file: File,
    error: Arc<OnceLock<String>>,
}

impl CheckedFile {
    fn record<T>(&self, res: std::io::Result<T>) -> std::io::Result<T> {
        if let Err(e) = &res {
            let _ = self.error.set(e.to_string());
        }
        res
    }
}

impl Write for CheckedFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let res = self.file.write(buf);
        self.record(res)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let res = self.file.flush();
        self.record(res)
    }
}

/// Animated GIF sink built on the `image` crate. Needs no external tools.
pub struct GifSink {
    out_path: PathBuf,
    /// NeuQuant speed, 1 (best) to 30 (fastest).
    speed: i32,
    bg_rgb: [u8; 3],
    encoder: Option<GifEncoder<BufWriter<CheckedFile>>>,
    write_error: Arc<OnceLock<String>>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    scratch: Vec<u8>,
}

impl GifSink {
    /// Sink writing to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            speed: 10,
            bg_rgb: [0, 0, 0],
            encoder: None,
            write_error: Arc::new(OnceLock::new()),
            cfg: None,
            last_idx: None,
            scratch: Vec::new(),
        }
    }

    /// Background used to flatten alpha.
    pub fn with_background(mut self, bg_rgb: [u8; 3]) -> Self {
        self.bg_rgb = bg_rgb;
        self
    }
}

impl VideoSink for GifSink {
    fn codec(&self) -> &'static str {
        GIF_CODEC
    }

    fn begin(&mut self, cfg: SinkConfig) -> LakebloomResult<()> {
        cfg.validate()?;
        if cfg.width > u32::from(u16::MAX) || cfg.height > u32::from(u16::MAX) {
            return Err(LakebloomError::invalid_parameter(format!(
                "gif frames are limited to 65535x65535, got {}x{}",
                cfg.width, cfg.height
            )));
        }
        ensure_parent_dir(&self.out_path)?;
        let file = File::create(&self.out_path).map_err(|e| {
            LakebloomError::encode(format!(
                "cannot create '{}': {e}",
                self.out_path.display()
            ))
        })?;
        self.write_error = Arc::new(OnceLock::new());
        let file = CheckedFile {
            file,
            error: Arc::clone(&self.write_error),
        };
        let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), self.speed);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| LakebloomError::encode(format!("gif header: {e}")))?;

        self.scratch = vec![0u8; (cfg.width * cfg.height * 4) as usize];
        self.encoder = Some(encoder);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LakebloomResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| LakebloomError::encode("gif sink not started"))?;
        check_frame(&cfg, self.last_idx, idx, frame)?;
        self.last_idx = Some(idx);

        flatten_premul_over_bg(&mut self.scratch, &frame.data, self.bg_rgb)?;
        let buffer = RgbaImage::from_raw(cfg.width, cfg.height, self.scratch.clone())
            .ok_or_else(|| LakebloomError::encode("gif frame buffer size mismatch"))?;
        // GIF delays are in hundredths of a second; `image` rounds this ratio for us.
        let delay = Delay::from_numer_denom_ms(1000 * cfg.fps.den, cfg.fps.num);

        let Some(encoder) = self.encoder.as_mut() else {
            return Err(LakebloomError::encode("gif sink is already finalized"));
        };
        encoder
            .encode_frame(Frame::from_parts(buffer, 0, 0, delay))
            .map_err(|e| LakebloomError::encode(format!("gif frame {}: {e}", idx.0)))
    }

    fn end(&mut self) -> LakebloomResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| LakebloomError::encode("gif sink not started"))?;
        drop(encoder);
        if let Some(e) = self.write_error.get() {
            return Err(LakebloomError::encode(format!(
                "failed to write '{}': {e}",
                self.out_path.display()
            )));
        }
        let written = std::fs::metadata(&self.out_path)
            .map(|m| m.len())
            .map_err(|e| {
                LakebloomError::encode(format!("cannot stat '{}': {e}", self.out_path.display()))
            })?;
        if written == 0 {
            return Err(LakebloomError::encode(format!(
                "'{}' is empty after encoding",
                self.out_path.display()
            )));
        }
        self.cfg = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
