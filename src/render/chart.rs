use std::{fmt::Write as _, path::Path};

use chrono::Datelike;
use kurbo::{BezPath, Point};

use crate::{
    foundation::core::years_between,
    foundation::error::{LakebloomError, LakebloomResult},
    foundation::fs::write_atomically,
    render::svg::{FrameRGBA, draw_svg, escape_xml, even, opaque_pixmap},
    series::record::TimeSeriesRecord,
    series::stats::{EUTROPHIC_THRESHOLD, moving_average},
};

/// Layout and labels of the trend chart.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrendChartOpts {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Chart title.
    pub title: String,
    /// Trailing moving-average window, in samples.
    pub window: usize,
    /// Horizontal reference line.
    pub threshold: f64,
    /// Stamp the chart with a synthetic-data marker.
    pub synthetic: bool,
}

impl Default for TrendChartOpts {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 500,
            title: "Lake Victoria chlorophyll-a (monthly mean)".to_string(),
            window: 12,
            threshold: EUTROPHIC_THRESHOLD,
            synthetic: false,
        }
    }
}

const MARGIN_L: f64 = 64.0;
const MARGIN_R: f64 = 24.0;
const MARGIN_T: f64 = 48.0;
const MARGIN_B: f64 = 44.0;
const BG: [u8; 3] = [255, 255, 255];

/// Maps data coordinates (fractional years, value) onto the plot area.
struct Axes {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Axes {
    fn project(&self, x: f64, y: f64) -> Point {
        let fx = if self.x1 > self.x0 {
            (x - self.x0) / (self.x1 - self.x0)
        } else {
            0.5
        };
        let fy = (y - self.y0) / (self.y1 - self.y0);
        Point::new(
            self.left + fx * (self.right - self.left),
            self.bottom - fy * (self.bottom - self.top),
        )
    }
}

fn polyline(points: impl IntoIterator<Item = Point>) -> BezPath {
    let mut path = BezPath::new();
    for (i, p) in points.into_iter().enumerate() {
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path
}

/// Rasterize the trend chart without touching the filesystem.
pub fn trend_chart_pixels(
    records: &[TimeSeriesRecord],
    opts: &TrendChartOpts,
) -> LakebloomResult<FrameRGBA> {
    let Some(first) = records.first() else {
        return Err(LakebloomError::empty_input("trend chart needs at least one record"));
    };
    if opts.window == 0 {
        return Err(LakebloomError::invalid_parameter(
            "trend chart window must be >= 1, got 0",
        ));
    }
    if !opts.threshold.is_finite() {
        return Err(LakebloomError::invalid_parameter(format!(
            "trend chart threshold must be finite, got {}",
            opts.threshold
        )));
    }
    let width = even(opts.width.max(160));
    let height = even(opts.height.max(120));

    let origin = first.date;
    let xs: Vec<f64> = records
        .iter()
        .map(|r| first.date.year() as f64 + years_between(origin, r.date))
        .collect();
    let values: Vec<f64> = records.iter().map(|r| r.value).collect();
    let smooth = moving_average(&values, opts.window);

    let (mut lo, mut hi) = values
        .iter()
        .copied()
        .chain(std::iter::once(opts.threshold))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    lo = lo.min(0.0);
    if hi - lo < 1e-9 {
        hi = lo + 1.0;
    }
    hi += (hi - lo) * 0.05;

    let axes = Axes {
        x0: xs[0],
        x1: xs[xs.len() - 1],
        y0: lo,
        y1: hi,
        left: MARGIN_L,
        right: width as f64 - MARGIN_R,
        top: MARGIN_T,
        bottom: height as f64 - MARGIN_B,
    };

    let raw = polyline(xs.iter().zip(&values).map(|(&x, &v)| axes.project(x, v)));
    // A gap-free trailing average starts at `window - 1`; `None` entries are only at the front.
    let avg = polyline(
        xs.iter()
            .zip(&smooth)
            .filter_map(|(&x, v)| v.map(|v| axes.project(x, v))),
    );
    let threshold = polyline([
        axes.project(axes.x0, opts.threshold),
        axes.project(axes.x1, opts.threshold),
    ]);

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = write!(
        svg,
        r##"<text x="{MARGIN_L}" y="28" font-family="sans-serif" font-size="18" font-weight="bold" fill="#1b1f2a">{}</text>"##,
        escape_xml(&opts.title)
    );

    // Axes frame and year ticks.
    let _ = write!(
        svg,
        r##"<rect x="{}" y="{}" width="{:.1}" height="{:.1}" fill="none" stroke="#4a4f5c" stroke-width="1"/>"##,
        axes.left,
        axes.top,
        axes.right - axes.left,
        axes.bottom - axes.top
    );
    let first_year = first.date.year();
    let last_year = records[records.len() - 1].date.year();
    let span = (last_year - first_year).max(1);
    let year_step = match span {
        0..=10 => 1,
        11..=30 => 5,
        _ => 10,
    };
    for year in (first_year..=last_year).filter(|y| (y - first_year) % year_step == 0) {
        let p = axes.project(year as f64, axes.y0);
        if p.x < axes.left - 0.5 || p.x > axes.right + 0.5 {
            continue;
        }
        let _ = write!(
            svg,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#4a4f5c" stroke-width="1"/><text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11" text-anchor="middle" fill="#1b1f2a">{year}</text>"##,
            p.x,
            axes.bottom,
            p.x,
            axes.bottom + 5.0,
            p.x,
            axes.bottom + 18.0
        );
    }
    for i in 0..=4 {
        let v = axes.y0 + (axes.y1 - axes.y0) * f64::from(i) / 4.0;
        let p = axes.project(axes.x0, v);
        let _ = write!(
            svg,
            r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#d9dce3" stroke-width="1"/><text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="11" text-anchor="end" fill="#1b1f2a">{v:.0}</text>"##,
            axes.left,
            p.y,
            axes.right,
            p.y,
            axes.left - 6.0,
            p.y + 4.0
        );
    }
    let _ = write!(
        svg,
        r##"<text x="{x:.1}" y="{y:.1}" font-family="sans-serif" font-size="12" text-anchor="middle" fill="#1b1f2a" transform="rotate(-90 {x:.1} {y:.1})">chl-a (mg/m³)</text>"##,
        x = 18.0,
        y = (axes.top + axes.bottom) * 0.5
    );

    let _ = write!(
        svg,
        r##"<path d="{}" fill="none" stroke="#7aa6d8" stroke-width="1"/>"##,
        raw.to_svg()
    );
    if !avg.elements().is_empty() {
        let _ = write!(
            svg,
            r##"<path d="{}" fill="none" stroke="#0b3d91" stroke-width="2.5"/>"##,
            avg.to_svg()
        );
    }
    let _ = write!(
        svg,
        r##"<path d="{}" fill="none" stroke="#cc0000" stroke-width="1.5" stroke-dasharray="8 5"/>"##,
        threshold.to_svg()
    );
    let label = axes.project(axes.x0, opts.threshold);
    let _ = write!(
        svg,
        r##"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" fill="#cc0000">Eutrophic threshold</text>"##,
        label.x + 6.0,
        label.y - 6.0
    );

    let legend_x = axes.right - 190.0;
    let _ = write!(
        svg,
        r##"<line x1="{lx:.1}" y1="{y1:.1}" x2="{lx2:.1}" y2="{y1:.1}" stroke="#7aa6d8" stroke-width="2"/><text x="{tx:.1}" y="{t1:.1}" font-family="sans-serif" font-size="11" fill="#1b1f2a">Monthly mean</text><line x1="{lx:.1}" y1="{y2:.1}" x2="{lx2:.1}" y2="{y2:.1}" stroke="#0b3d91" stroke-width="2.5"/><text x="{tx:.1}" y="{t2:.1}" font-family="sans-serif" font-size="11" fill="#1b1f2a">{w}-month moving average</text>"##,
        lx = legend_x,
        lx2 = legend_x + 24.0,
        tx = legend_x + 30.0,
        y1 = axes.top + 14.0,
        t1 = axes.top + 18.0,
        y2 = axes.top + 30.0,
        t2 = axes.top + 34.0,
        w = opts.window
    );

    if opts.synthetic {
        let _ = write!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="12" fill="#b85c00">SYNTHETIC DEMO DATA</text>"##,
            axes.left + 8.0,
            axes.bottom - 8.0
        );
    }
    svg.push_str("</svg>");

    let mut pixmap = opaque_pixmap(width, height, BG)?;
    draw_svg(&mut pixmap, &svg)?;
    Ok(FrameRGBA::from_pixmap(pixmap))
}

/// Write the trend chart PNG to `out_path`.
#[tracing::instrument(
    skip(records, opts),
    fields(records = records.len(), out = %out_path.display())
)]
pub fn render_trend_chart(
    records: &[TimeSeriesRecord],
    opts: &TrendChartOpts,
    out_path: &Path,
) -> LakebloomResult<()> {
    let image = trend_chart_pixels(records, opts)?;
    write_atomically(out_path, |tmp| image.save_png(tmp))?;
    tracing::info!(path = %out_path.display(), "trend chart written");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/chart.rs"]
mod tests;
