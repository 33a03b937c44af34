use std::{path::Path, sync::Arc, sync::OnceLock};

use resvg::tiny_skia;

use crate::foundation::error::{LakebloomError, LakebloomResult};

/// Premultiplied RGBA8 image produced by the renderers.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8, tightly packed.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Take the pixels out of a pixmap.
    pub(crate) fn from_pixmap(pixmap: tiny_skia::Pixmap) -> Self {
        Self {
            width: pixmap.width(),
            height: pixmap.height(),
            data: pixmap.take(),
        }
    }

    /// RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Encode as PNG at `path`.
    pub fn save_png(&self, path: &Path) -> LakebloomResult<()> {
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| LakebloomError::render(format!("cannot write png '{}': {e}", path.display())))
    }
}

/// Font database shared by every overlay and chart in the process.
///
/// System fonts are scanned once; when none are installed text is silently dropped and the rest
/// of the image still renders.
pub(crate) fn shared_fontdb() -> Arc<usvg::fontdb::Database> {
    static DB: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "loaded system fonts for overlays");
        Arc::new(db)
    })
    .clone()
}

/// Parse an SVG document built by this crate.
pub(crate) fn parse_svg(svg: &str) -> LakebloomResult<usvg::Tree> {
    let opts = usvg::Options {
        fontdb: shared_fontdb(),
        ..Default::default()
    };
    usvg::Tree::from_str(svg, &opts)
        .map_err(|e| LakebloomError::render(format!("cannot parse overlay svg: {e}")))
}

/// Draw `svg` over `pixmap`, user units mapped 1:1 to pixels.
pub(crate) fn draw_svg(pixmap: &mut tiny_skia::Pixmap, svg: &str) -> LakebloomResult<()> {
    let tree = parse_svg(svg)?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    Ok(())
}

/// Opaque pixmap filled with `bg`.
pub(crate) fn opaque_pixmap(
    width: u32,
    height: u32,
    bg: [u8; 3],
) -> LakebloomResult<tiny_skia::Pixmap> {
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        LakebloomError::invalid_parameter(format!("cannot allocate a {width}x{height} image"))
    })?;
    pixmap.fill(tiny_skia::Color::from_rgba8(bg[0], bg[1], bg[2], 255));
    Ok(pixmap)
}

/// Escape text for use inside SVG character data and attributes.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Round `v` up to the next even number.
pub(crate) fn even(v: u32) -> u32 {
    v + (v & 1)
}

#[cfg(test)]
#[path = "../../tests/unit/render/svg.rs"]
mod tests;
