use chrono::{Datelike, Months, NaiveDate};

use crate::foundation::error::{LakebloomError, LakebloomResult};

/// 0-based position of a frame in the rendered sequence.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> LakebloomResult<Self> {
        if den == 0 {
            return Err(LakebloomError::invalid_parameter("fps den must be > 0"));
        }
        if num == 0 {
            return Err(LakebloomError::invalid_parameter("fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number frame rate.
    pub fn integer(fps: u32) -> LakebloomResult<Self> {
        Self::new(fps, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 6, den: 1 }
    }
}

/// Closed interval `[lo, hi]` of scalar values.
///
/// The pipeline keeps three of these apart: the valid series range, the field clamp range, and the
/// color scale display range.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValueRange {
    /// Inclusive lower bound.
    pub lo: f64,
    /// Inclusive upper bound.
    pub hi: f64,
}

impl ValueRange {
    /// Create a validated range with finite `lo < hi`.
    pub fn new(lo: f64, hi: f64) -> LakebloomResult<Self> {
        let r = Self { lo, hi };
        r.validate("value range")?;
        Ok(r)
    }

    /// Check the range, naming it as `what` in the error.
    pub fn validate(&self, what: &str) -> LakebloomResult<()> {
        if !self.lo.is_finite() || !self.hi.is_finite() || self.lo >= self.hi {
            return Err(LakebloomError::invalid_parameter(format!(
                "{what} must be finite with lo < hi, got [{}, {}]",
                self.lo, self.hi
            )));
        }
        Ok(())
    }

    /// Clamp `v` into the range.
    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.lo, self.hi)
    }

    /// Return `true` when `v` lies inside the closed range.
    pub fn contains(&self, v: f64) -> bool {
        self.lo <= v && v <= self.hi
    }

    /// Position of `v` in the range as a fraction, clamped to `[0, 1]`.
    pub fn normalize(&self, v: f64) -> f64 {
        ((v - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0)
    }
}

/// A longitude/latitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees east.
    pub lon: f64,
    /// Latitude in degrees north.
    pub lat: f64,
}

impl GeoPoint {
    /// Create a point.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Squared euclidean distance in degree space.
    pub fn distance_sq(self, other: GeoPoint) -> f64 {
        let dx = self.lon - other.lon;
        let dy = self.lat - other.lat;
        dx * dx + dy * dy
    }
}

/// Geographic domain shared by every raster of a run.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoBoundingBox {
    /// Western edge.
    pub lon_min: f64,
    /// Eastern edge.
    pub lon_max: f64,
    /// Southern edge.
    pub lat_min: f64,
    /// Northern edge.
    pub lat_max: f64,
}

impl GeoBoundingBox {
    /// Lake Victoria basin, matching the GEE export region.
    pub const LAKE_VICTORIA: Self = Self {
        lon_min: 31.0,
        lon_max: 35.0,
        lat_min: -3.0,
        lat_max: 1.0,
    };

    /// Reject non-finite or inverted bounds.
    pub fn validate(&self) -> LakebloomResult<()> {
        let all = [self.lon_min, self.lon_max, self.lat_min, self.lat_max];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(LakebloomError::invalid_parameter(format!(
                "bounding box has non-finite bounds: {self:?}"
            )));
        }
        if self.lon_min >= self.lon_max {
            return Err(LakebloomError::invalid_parameter(format!(
                "bounding box lon_min ({}) must be < lon_max ({})",
                self.lon_min, self.lon_max
            )));
        }
        if self.lat_min >= self.lat_max {
            return Err(LakebloomError::invalid_parameter(format!(
                "bounding box lat_min ({}) must be < lat_max ({})",
                self.lat_min, self.lat_max
            )));
        }
        Ok(())
    }

    /// Return `true` when `p` lies inside the box (edges included).
    pub fn contains(&self, p: GeoPoint) -> bool {
        self.lon_min <= p.lon
            && p.lon <= self.lon_max
            && self.lat_min <= p.lat
            && p.lat <= self.lat_max
    }
}

impl Default for GeoBoundingBox {
    fn default() -> Self {
        Self::LAKE_VICTORIA
    }
}

/// Raster sampling dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GridShape {
    /// Samples along longitude (columns).
    pub nx: usize,
    /// Samples along latitude (rows).
    pub ny: usize,
}

impl GridShape {
    /// Both dimensions must be positive.
    pub fn validate(&self) -> LakebloomResult<()> {
        if self.nx == 0 {
            return Err(LakebloomError::invalid_parameter(
                "grid dimension n_x must be a positive integer, got 0",
            ));
        }
        if self.ny == 0 {
            return Err(LakebloomError::invalid_parameter(
                "grid dimension n_y must be a positive integer, got 0",
            ));
        }
        Ok(())
    }

    /// Total cell count.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Return `true` for a degenerate grid.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self { nx: 200, ny: 200 }
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Every month start from `first` to `last`, both inclusive.
///
/// Inputs are normalized to the first of their month. An inverted range yields an empty vec.
pub fn month_range(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let last = month_start(last);
    let mut out = Vec::new();
    let mut cur = month_start(first);
    while cur <= last {
        out.push(cur);
        match cur.checked_add_months(Months::new(1)) {
            Some(next) => cur = next,
            None => break,
        }
    }
    out
}

/// Human-readable `Month YYYY` label.
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Fractional years elapsed from `origin` to `date` (months / 12 plus day fraction).
pub fn years_between(origin: NaiveDate, date: NaiveDate) -> f64 {
    let months = (date.year() - origin.year()) * 12 + date.month() as i32 - origin.month() as i32;
    let days = date.day() as f64 - origin.day() as f64;
    f64::from(months) / 12.0 + days / 365.25
}

/// Serde adapter storing `Option<Duration>` as whole milliseconds.
pub(crate) mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
