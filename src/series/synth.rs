use chrono::NaiveDate;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Bernoulli, Distribution, Normal};

use crate::{
    foundation::core::{ValueRange, month_range},
    foundation::error::{LakebloomError, LakebloomResult},
    foundation::math::lerp,
    series::record::TimeSeriesRecord,
};

/// Generator settings for the synthetic demo series.
///
/// Defaults reproduce the Lake Victoria demo: 310 months from January 2000 to October 2025, a trend
/// from 8 to 15 mg/m³, a yearly cycle of amplitude 3, and rare +10 bloom spikes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SeriesParams {
    /// Seed for the explicit generator.
    pub seed: u64,
    /// First month (inclusive).
    pub first_month: NaiveDate,
    /// Last month (inclusive).
    pub last_month: NaiveDate,
    /// Trend value at the first month.
    pub trend_start: f64,
    /// Trend value at the last month.
    pub trend_end: f64,
    /// Seasonal sine amplitude.
    pub seasonal_amplitude: f64,
    /// Seasonal period in months.
    pub seasonal_period: f64,
    /// Standard deviation of the per-month normal noise.
    pub noise_std: f64,
    /// Probability that a month carries a bloom spike.
    pub spike_probability: f64,
    /// Value added by a bloom spike.
    pub spike_magnitude: f64,
    /// Valid physical range every value is clipped to.
    pub valid_range: ValueRange,
}

impl Default for SeriesParams {
    fn default() -> Self {
        Self {
            seed: 42,
            first_month: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            last_month: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap_or_default(),
            trend_start: 8.0,
            trend_end: 15.0,
            seasonal_amplitude: 3.0,
            seasonal_period: 12.0,
            noise_std: 1.5,
            spike_probability: 0.08,
            spike_magnitude: 10.0,
            valid_range: ValueRange { lo: 2.0, hi: 45.0 },
        }
    }
}

impl SeriesParams {
    /// Reject settings the generator cannot honour.
    pub fn validate(&self) -> LakebloomResult<()> {
        self.valid_range.validate("series valid_range")?;
        if self.first_month > self.last_month {
            return Err(LakebloomError::invalid_parameter(format!(
                "series first_month ({}) must not be after last_month ({})",
                self.first_month, self.last_month
            )));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(LakebloomError::invalid_parameter(format!(
                "series noise_std must be finite and >= 0, got {}",
                self.noise_std
            )));
        }
        if !(0.0..=1.0).contains(&self.spike_probability) {
            return Err(LakebloomError::invalid_parameter(format!(
                "series spike_probability must be in [0, 1], got {}",
                self.spike_probability
            )));
        }
        if !self.seasonal_period.is_finite() || self.seasonal_period <= 0.0 {
            return Err(LakebloomError::invalid_parameter(format!(
                "series seasonal_period must be > 0, got {}",
                self.seasonal_period
            )));
        }
        let finite = [
            self.trend_start,
            self.trend_end,
            self.seasonal_amplitude,
            self.spike_magnitude,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(LakebloomError::invalid_parameter(
                "series trend, seasonal amplitude and spike magnitude must be finite",
            ));
        }
        Ok(())
    }

    /// Months covered by the series.
    pub fn months(&self) -> Vec<NaiveDate> {
        month_range(self.first_month, self.last_month)
    }

    /// Trend value at index `i` of `n`.
    pub fn trend(&self, i: usize, n: usize) -> f64 {
        if n <= 1 {
            return self.trend_start;
        }
        lerp(self.trend_start, self.trend_end, i as f64 / (n - 1) as f64)
    }

    /// Seasonal term at index `i`.
    pub fn seasonal(&self, i: usize) -> f64 {
        self.seasonal_amplitude * (std::f64::consts::TAU * i as f64 / self.seasonal_period).sin()
    }
}

/// Additive parts of one synthetic value before clipping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesComponents {
    /// Linear trend.
    pub trend: f64,
    /// Seasonal cycle.
    pub seasonal: f64,
    /// Normal noise draw.
    pub noise: f64,
    /// Bloom spike (0 or the configured magnitude).
    pub spike: f64,
}

impl SeriesComponents {
    /// Unclipped sum.
    pub fn raw(&self) -> f64 {
        self.trend + self.seasonal + self.noise + self.spike
    }
}

/// Per-month components drawn from `rng`.
///
/// All noise values are drawn before any spike decision, so the stream layout matches a vectorized
/// generator.
pub fn synthesize_components<R: Rng + ?Sized>(
    params: &SeriesParams,
    rng: &mut R,
) -> LakebloomResult<Vec<(NaiveDate, SeriesComponents)>> {
    params.validate()?;
    let months = params.months();
    let n = months.len();

    let normal = Normal::new(0.0, params.noise_std).map_err(|e| {
        LakebloomError::invalid_parameter(format!("series noise_std {}: {e}", params.noise_std))
    })?;
    let spike = Bernoulli::new(params.spike_probability).map_err(|e| {
        LakebloomError::invalid_parameter(format!(
            "series spike_probability {}: {e}",
            params.spike_probability
        ))
    })?;

    let noise: Vec<f64> = (0..n).map(|_| normal.sample(&mut *rng)).collect();
    let spikes: Vec<f64> = (0..n)
        .map(|_| {
            if spike.sample(&mut *rng) {
                params.spike_magnitude
            } else {
                0.0
            }
        })
        .collect();

    Ok(months
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            (
                date,
                SeriesComponents {
                    trend: params.trend(i, n),
                    seasonal: params.seasonal(i),
                    noise: noise[i],
                    spike: spikes[i],
                },
            )
        })
        .collect())
}

/// Synthesize the series from an explicit generator.
pub fn synthesize_series_with<R: Rng + ?Sized>(
    params: &SeriesParams,
    rng: &mut R,
) -> LakebloomResult<Vec<TimeSeriesRecord>> {
    let components = synthesize_components(params, rng)?;
    Ok(components
        .into_iter()
        .map(|(date, c)| TimeSeriesRecord::new(date, params.valid_range.clamp(c.raw())))
        .collect())
}

/// Synthesize the series from a generator seeded with `params.seed`.
#[tracing::instrument(skip(params), fields(seed = params.seed))]
pub fn synthesize_series(params: &SeriesParams) -> LakebloomResult<Vec<TimeSeriesRecord>> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let records = synthesize_series_with(params, &mut rng)?;
    tracing::debug!(months = records.len(), "synthesized demo series");
    Ok(records)
}

#[cfg(test)]
#[path = "../../tests/unit/series/synth.rs"]
mod tests;
