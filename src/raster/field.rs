use chrono::NaiveDate;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::{
    foundation::core::{GeoBoundingBox, GeoPoint, GridShape, ValueRange},
    foundation::error::{LakebloomError, LakebloomResult},
    foundation::math::derive_seed,
    raster::grid::CoordinateGrid,
};

/// Gaussian bloom kernel plus texture and noise.
///
/// Defaults center the bloom on the Winam Gulf and let its peak grow from 8 to 30 mg/m³ across the
/// sequence. The growth is a presentation device for demo data, not a physical claim.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BloomKernelParams {
    /// Stationary bloom center.
    pub center: GeoPoint,
    /// Peak amplitude at the first frame.
    pub base_amplitude: f64,
    /// Extra peak amplitude reached at the last frame.
    pub growth_amplitude: f64,
    /// Squared-distance decay scale (degrees²).
    pub decay_scale: f64,
    /// Uniform background level.
    pub background: f64,
    /// Amplitude of the `sin(k·lon)·cos(k·lat)` texture.
    pub texture_amplitude: f64,
    /// Wavenumber `k` of the texture, in radians per degree.
    pub texture_wavenumber: f64,
    /// Standard deviation of per-cell noise.
    pub noise_std: f64,
    /// Upper clamp for every cell.
    pub field_max: f64,
    /// Base seed; frame `i` draws from `derive_seed(seed, i)`.
    pub seed: u64,
}

impl Default for BloomKernelParams {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(34.4, -0.1),
            base_amplitude: 8.0,
            growth_amplitude: 22.0,
            decay_scale: 0.35,
            background: 2.0,
            texture_amplitude: 1.5,
            texture_wavenumber: 3.0,
            noise_std: 0.8,
            field_max: 50.0,
            seed: 42,
        }
    }
}

impl BloomKernelParams {
    /// Reject settings that would break the field invariants.
    pub fn validate(&self) -> LakebloomResult<()> {
        fn finite(name: &str, v: f64) -> LakebloomResult<()> {
            if v.is_finite() {
                Ok(())
            } else {
                Err(LakebloomError::invalid_parameter(format!(
                    "bloom kernel {name} must be finite, got {v}"
                )))
            }
        }

        finite("center.lon", self.center.lon)?;
        finite("center.lat", self.center.lat)?;
        finite("base_amplitude", self.base_amplitude)?;
        finite("background", self.background)?;
        finite("texture_amplitude", self.texture_amplitude)?;
        finite("texture_wavenumber", self.texture_wavenumber)?;
        if !self.growth_amplitude.is_finite() || self.growth_amplitude < 0.0 {
            return Err(LakebloomError::invalid_parameter(format!(
                "bloom kernel growth_amplitude must be >= 0, got {}",
                self.growth_amplitude
            )));
        }
        if !self.decay_scale.is_finite() || self.decay_scale <= 0.0 {
            return Err(LakebloomError::invalid_parameter(format!(
                "bloom kernel decay_scale must be > 0, got {}",
                self.decay_scale
            )));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(LakebloomError::invalid_parameter(format!(
                "bloom kernel noise_std must be >= 0, got {}",
                self.noise_std
            )));
        }
        if !self.field_max.is_finite() || self.field_max <= 0.0 {
            return Err(LakebloomError::invalid_parameter(format!(
                "bloom kernel field_max must be > 0, got {}",
                self.field_max
            )));
        }
        Ok(())
    }

    /// Clamp range applied to every cell.
    pub fn field_range(&self) -> ValueRange {
        ValueRange {
            lo: 0.0,
            hi: self.field_max,
        }
    }

    /// Peak amplitude for position `index` of `total`.
    pub fn amplitude(&self, index: usize, total: usize) -> f64 {
        self.base_amplitude + self.growth_amplitude * time_fraction(index, total)
    }
}

/// Raster configuration: domain, sampling, and kernel.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RasterParams {
    /// Geographic domain of every field.
    pub bbox: GeoBoundingBox,
    /// Sampling dimensions.
    pub grid: GridShape,
    /// Bloom kernel.
    pub kernel: BloomKernelParams,
}

/// `index / max(1, total - 1)`: 0 at the first frame, 1 at the last.
pub fn time_fraction(index: usize, total: usize) -> f64 {
    index as f64 / total.saturating_sub(1).max(1) as f64
}

/// One timestamp's concentration grid, row-major with row 0 at the northern edge.
#[derive(Clone, Debug, PartialEq)]
pub struct ConcentrationField {
    /// Month the field represents.
    pub date: NaiveDate,
    /// Position in the synthesized sequence.
    pub index: usize,
    /// Grid dimensions.
    pub shape: GridShape,
    /// Peak kernel amplitude used for this field.
    pub amplitude: f64,
    /// Cell values, `shape.nx * shape.ny` long.
    pub values: Vec<f64>,
}

impl ConcentrationField {
    /// Value at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.shape.nx + x]
    }

    /// Smallest and largest cell value.
    pub fn min_max(&self) -> (f64, f64) {
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Deterministic generator of [`ConcentrationField`]s.
///
/// The grid and the time-invariant parts of every cell (squared distance to the center, texture)
/// are computed once at construction and shared read-only by all frames.
#[derive(Clone, Debug)]
pub struct RasterSynthesizer {
    grid: CoordinateGrid,
    kernel: BloomKernelParams,
    dist_sq: Vec<f64>,
    texture: Vec<f64>,
}

impl RasterSynthesizer {
    /// Validate `params` and precompute the static cell terms.
    pub fn new(params: &RasterParams) -> LakebloomResult<Self> {
        params.kernel.validate()?;
        let grid = CoordinateGrid::new(params.bbox, params.grid)?;
        let kernel = params.kernel.clone();

        let center = kernel.center;
        let k = kernel.texture_wavenumber;
        let (dist_sq, texture): (Vec<f64>, Vec<f64>) = grid
            .points()
            .map(|p| {
                (
                    p.distance_sq(center),
                    kernel.texture_amplitude * (k * p.lon).sin() * (k * p.lat).cos(),
                )
            })
            .unzip();

        Ok(Self {
            grid,
            kernel,
            dist_sq,
            texture,
        })
    }

    /// Shared coordinate grid.
    pub fn grid(&self) -> &CoordinateGrid {
        &self.grid
    }

    /// Kernel settings.
    pub fn kernel(&self) -> &BloomKernelParams {
        &self.kernel
    }

    /// One field per timestamp, in order.
    #[tracing::instrument(skip(self, timestamps), fields(frames = timestamps.len()))]
    pub fn synthesize(&self, timestamps: &[NaiveDate]) -> LakebloomResult<Vec<ConcentrationField>> {
        let total = timestamps.len();
        timestamps
            .iter()
            .enumerate()
            .map(|(i, &date)| self.synthesize_one(date, i, total))
            .collect()
    }

    /// Same output as [`Self::synthesize`], computed on the current rayon pool.
    ///
    /// Each frame seeds its own generator, so the result does not depend on scheduling.
    pub fn synthesize_par(
        &self,
        timestamps: &[NaiveDate],
    ) -> LakebloomResult<Vec<ConcentrationField>> {
        let total = timestamps.len();
        timestamps
            .par_iter()
            .enumerate()
            .map(|(i, &date)| self.synthesize_one(date, i, total))
            .collect()
    }

    /// Field for position `index` of a `total`-long sequence.
    pub fn synthesize_one(
        &self,
        date: NaiveDate,
        index: usize,
        total: usize,
    ) -> LakebloomResult<ConcentrationField> {
        if index >= total {
            return Err(LakebloomError::invalid_parameter(format!(
                "field index {index} out of range for a sequence of {total}"
            )));
        }

        let amplitude = self.kernel.amplitude(index, total);
        let noise = Normal::new(0.0, self.kernel.noise_std).map_err(|e| {
            LakebloomError::invalid_parameter(format!(
                "bloom kernel noise_std {}: {e}",
                self.kernel.noise_std
            ))
        })?;
        let mut rng = StdRng::seed_from_u64(derive_seed(self.kernel.seed, index as u64));
        let range = self.kernel.field_range();
        let decay = self.kernel.decay_scale;
        let background = self.kernel.background;

        let values = self
            .dist_sq
            .iter()
            .zip(&self.texture)
            .map(|(&d2, &tex)| {
                let v = amplitude * (-d2 / decay).exp() + background + tex + noise.sample(&mut rng);
                range.clamp(v)
            })
            .collect();

        Ok(ConcentrationField {
            date,
            index,
            shape: self.grid.shape(),
            amplitude,
            values,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/field.rs"]
mod tests;
