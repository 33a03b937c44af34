use crate::{
    foundation::core::ValueRange,
    foundation::error::{LakebloomError, LakebloomResult},
};

/// Palette used by the GEE chlorophyll-a visualization, low to high.
pub const CHLA_PALETTE: [&str; 6] = [
    "#000033", "#0066ff", "#00ff00", "#ffff00", "#ff6600", "#cc0000",
];

/// Piecewise-linear color scale over a fixed display range.
///
/// The range is fixed for a whole run so frames are comparable; values outside it map to the end
/// colors.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorScale {
    stops: Vec<[u8; 3]>,
    range: ValueRange,
}

impl ColorScale {
    /// Build a scale from `#rrggbb` stops.
    pub fn new(stops: &[impl AsRef<str>], range: ValueRange) -> LakebloomResult<Self> {
        range.validate("color scale display_range")?;
        if stops.len() < 2 {
            return Err(LakebloomError::invalid_parameter(format!(
                "color scale needs at least 2 stops, got {}",
                stops.len()
            )));
        }
        let stops = stops
            .iter()
            .map(|s| parse_hex_rgb(s.as_ref()))
            .collect::<LakebloomResult<Vec<_>>>()?;
        Ok(Self { stops, range })
    }

    /// GEE palette over `range`.
    pub fn chla(range: ValueRange) -> LakebloomResult<Self> {
        Self::new(&CHLA_PALETTE, range)
    }

    /// Display range shared by every frame.
    pub fn range(&self) -> ValueRange {
        self.range
    }

    /// Parsed stops, low to high.
    pub fn stops(&self) -> &[[u8; 3]] {
        &self.stops
    }

    /// Color for `value`.
    pub fn map(&self, value: f64) -> [u8; 3] {
        let t = if value.is_nan() {
            0.0
        } else {
            self.range.normalize(value)
        };
        let segments = (self.stops.len() - 1) as f64;
        let pos = t * segments;
        let i = (pos.floor() as usize).min(self.stops.len() - 2);
        let f = pos - i as f64;
        let a = self.stops[i];
        let b = self.stops[i + 1];
        [
            mix_channel(a[0], b[0], f),
            mix_channel(a[1], b[1], f),
            mix_channel(a[2], b[2], f),
        ]
    }
}

fn mix_channel(a: u8, b: u8, f: f64) -> u8 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * f)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Parse `#rrggbb`.
pub fn parse_hex_rgb(s: &str) -> LakebloomResult<[u8; 3]> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(LakebloomError::invalid_parameter(format!(
            "color '{s}' is not #rrggbb"
        )));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| {
            LakebloomError::invalid_parameter(format!("color '{s}' is not #rrggbb"))
        })
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// `#rrggbb` form of `rgb`.
pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

#[cfg(test)]
#[path = "../../tests/unit/render/colormap.rs"]
mod tests;
