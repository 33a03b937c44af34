use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use crate::{
    foundation::core::{ValueRange, month_label},
    foundation::error::{LakebloomError, LakebloomResult},
    foundation::fs::write_atomically,
    raster::field::ConcentrationField,
    render::colormap::{ColorScale, to_hex},
    render::svg::{FrameRGBA, draw_svg, escape_xml, even, opaque_pixmap},
};

/// Digits of the zero-padded frame index in file names.
pub const FRAME_INDEX_WIDTH: usize = 4;
/// Largest index that fits [`FRAME_INDEX_WIDTH`].
pub const MAX_FRAME_INDEX: usize = 9_999;
/// File name prefix shared by all frames.
pub const FRAME_PREFIX: &str = "spatial_";

const LEFT: u32 = 16;
const TOP: u32 = 56;
const RIGHT: u32 = 96;
const BOTTOM: u32 = 20;
const BG: [u8; 3] = [18, 20, 28];

/// Visual settings shared by every frame of a run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FrameStyle {
    /// Pixels per grid cell along each axis.
    pub cell_px: u32,
    /// Fixed display range of the color scale.
    pub display_range: ValueRange,
    /// Title drawn above the month label.
    pub title: String,
    /// Unit shown under the color bar.
    pub unit: String,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            cell_px: 3,
            display_range: ValueRange { lo: 0.0, hi: 30.0 },
            title: "Lake Victoria chlorophyll-a".to_string(),
            unit: "mg/m³".to_string(),
        }
    }
}

impl FrameStyle {
    /// Reject zero cell size and an invalid display range.
    pub fn validate(&self) -> LakebloomResult<()> {
        if self.cell_px == 0 {
            return Err(LakebloomError::invalid_parameter(
                "frame cell_px must be >= 1, got 0",
            ));
        }
        self.display_range.validate("frame display_range")
    }
}

/// `spatial_<index>.png` with the index zero-padded to [`FRAME_INDEX_WIDTH`].
pub fn frame_file_name(index: usize) -> String {
    format!("{FRAME_PREFIX}{index:0width$}.png", width = FRAME_INDEX_WIDTH)
}

/// Turns [`ConcentrationField`]s into labelled PNG frames.
#[derive(Clone, Debug)]
pub struct FrameRenderer {
    style: FrameStyle,
    scale: ColorScale,
    synthetic: bool,
}

impl FrameRenderer {
    /// Renderer without the synthetic-data marker.
    pub fn new(style: FrameStyle) -> LakebloomResult<Self> {
        style.validate()?;
        let scale = ColorScale::chla(style.display_range)?;
        Ok(Self {
            style,
            scale,
            synthetic: false,
        })
    }

    /// Stamp every frame with a synthetic-data marker.
    pub fn with_synthetic_marker(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// Color scale shared by all frames.
    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Canvas size for a field of `nx × ny` cells; both sides are even.
    pub fn canvas_size(&self, nx: usize, ny: usize) -> (u32, u32) {
        let map_w = nx as u32 * self.style.cell_px;
        let map_h = ny as u32 * self.style.cell_px;
        (even(LEFT + map_w + RIGHT), even(TOP + map_h + BOTTOM))
    }

    /// Render `field` to pixels without touching the filesystem.
    pub fn render_pixels(&self, field: &ConcentrationField) -> LakebloomResult<FrameRGBA> {
        let nx = field.shape.nx;
        let ny = field.shape.ny;
        if nx == 0 || ny == 0 || field.values.len() != nx * ny {
            return Err(LakebloomError::invalid_parameter(format!(
                "field {} has {} values for a {nx}x{ny} grid",
                field.index,
                field.values.len()
            )));
        }

        let (width, height) = self.canvas_size(nx, ny);
        let mut pixmap = opaque_pixmap(width, height, BG)?;
        let cell = self.style.cell_px as usize;
        let stride = width as usize * 4;
        {
            let data = pixmap.data_mut();
            for y in 0..ny {
                for x in 0..nx {
                    let [r, g, b] = self.scale.map(field.get(x, y));
                    for dy in 0..cell {
                        let row = (TOP as usize + y * cell + dy) * stride;
                        for dx in 0..cell {
                            let i = row + (LEFT as usize + x * cell + dx) * 4;
                            data[i..i + 4].copy_from_slice(&[r, g, b, 255]);
                        }
                    }
                }
            }
        }

        let svg = self.overlay_svg(field, width, height);
        draw_svg(&mut pixmap, &svg)?;
        Ok(FrameRGBA::from_pixmap(pixmap))
    }

    /// Render `field` to `out_dir/spatial_<index>.png` and return the path.
    ///
    /// Creates `out_dir` when missing. Only the frame's own file is written.
    pub fn render(
        &self,
        field: &ConcentrationField,
        index: usize,
        out_dir: &Path,
    ) -> LakebloomResult<PathBuf> {
        if index > MAX_FRAME_INDEX {
            return Err(LakebloomError::invalid_parameter(format!(
                "frame index {index} exceeds the {FRAME_INDEX_WIDTH}-digit limit {MAX_FRAME_INDEX}"
            )));
        }
        std::fs::create_dir_all(out_dir).map_err(|e| {
            LakebloomError::render(format!(
                "cannot create frame directory '{}': {e}",
                out_dir.display()
            ))
        })?;

        let frame = self.render_pixels(field)?;
        let path = out_dir.join(frame_file_name(index));
        write_atomically(&path, |tmp| frame.save_png(tmp)).map_err(|e| match e {
            LakebloomError::Render(_) => e,
            other => LakebloomError::render(format!(
                "cannot write frame '{}': {other}",
                path.display()
            )),
        })?;
        tracing::debug!(index, path = %path.display(), "frame written");
        Ok(path)
    }

    fn overlay_svg(&self, field: &ConcentrationField, width: u32, height: u32) -> String {
        let map_w = field.shape.nx as u32 * self.style.cell_px;
        let map_h = field.shape.ny as u32 * self.style.cell_px;
        let bar_x = LEFT + map_w + 20;
        let bar_w = 18;
        let range = self.style.display_range;

        let mut svg = String::new();
        let _ = write!(
            svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"##
        );

        svg.push_str(r#"<defs><linearGradient id="scale" x1="0" y1="1" x2="0" y2="0">"#);
        let stops = self.scale.stops();
        let last = (stops.len() - 1) as f64;
        for (i, rgb) in stops.iter().enumerate() {
            let _ = write!(
                svg,
                r#"<stop offset="{:.4}" stop-color="{}"/>"#,
                i as f64 / last,
                to_hex(*rgb)
            );
        }
        svg.push_str("</linearGradient></defs>");

        let _ = write!(
            svg,
            r##"<text x="{LEFT}" y="22" font-family="sans-serif" font-size="14" fill="#9aa3b5">{}</text>"##,
            escape_xml(&self.style.title)
        );
        let _ = write!(
            svg,
            r##"<text x="{LEFT}" y="46" font-family="sans-serif" font-size="22" font-weight="bold" fill="#ffffff">{}</text>"##,
            escape_xml(&month_label(field.date))
        );
        let _ = write!(
            svg,
            r##"<rect x="{LEFT}" y="{TOP}" width="{map_w}" height="{map_h}" fill="none" stroke="#5c6577" stroke-width="1"/>"##
        );

        let _ = write!(
            svg,
            r##"<rect x="{bar_x}" y="{TOP}" width="{bar_w}" height="{map_h}" fill="url(#scale)" stroke="#5c6577" stroke-width="1"/>"##
        );
        let ticks = [
            (0.0, range.lo),
            (0.5, (range.lo + range.hi) * 0.5),
            (1.0, range.hi),
        ];
        for (frac, value) in ticks {
            let y = TOP as f64 + map_h as f64 * (1.0 - frac);
            let _ = write!(
                svg,
                r##"<text x="{}" y="{:.1}" font-family="sans-serif" font-size="11" fill="#ffffff">{}</text>"##,
                bar_x + bar_w + 4,
                y + 4.0,
                format_tick(value)
            );
        }
        let _ = write!(
            svg,
            r##"<text x="{bar_x}" y="{}" font-family="sans-serif" font-size="11" fill="#9aa3b5">{}</text>"##,
            TOP - 6,
            escape_xml(&self.style.unit)
        );

        if self.synthetic {
            let _ = write!(
                svg,
                r##"<text x="{}" y="{}" font-family="sans-serif" font-size="12" fill="#ffb347">SYNTHETIC DEMO DATA</text>"##,
                LEFT + 6,
                TOP + map_h - 8
            );
        }

        svg.push_str("</svg>");
        svg
    }
}

fn format_tick(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
