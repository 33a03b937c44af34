use crate::{
    foundation::core::years_between,
    foundation::error::{LakebloomError, LakebloomResult},
    series::record::TimeSeriesRecord,
};

/// Reference level above which a month counts as eutrophic (mg/m³).
pub const EUTROPHIC_THRESHOLD: f64 = 20.0;

/// Trailing mean over `window` samples.
///
/// The first `window - 1` entries are `None`, matching a rolling mean that requires a full window.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Whole-series statistics logged per run and written to the manifest.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SeriesSummary {
    /// Number of monthly records.
    pub months: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Least-squares slope in value units per year.
    pub slope_per_year: f64,
    /// Threshold used for `bloom_frequency_pct`.
    pub threshold: f64,
    /// Share of months strictly above `threshold`, in percent.
    pub bloom_frequency_pct: f64,
}

/// Summarize `records` against `threshold`.
pub fn summarize(records: &[TimeSeriesRecord], threshold: f64) -> LakebloomResult<SeriesSummary> {
    let Some(first) = records.first() else {
        return Err(LakebloomError::empty_input(
            "cannot summarize an empty series",
        ));
    };

    let n = records.len() as f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut above = 0usize;
    for r in records {
        min = min.min(r.value);
        max = max.max(r.value);
        sum += r.value;
        if r.value > threshold {
            above += 1;
        }
    }
    let mean = sum / n;

    let xs: Vec<f64> = records
        .iter()
        .map(|r| years_between(first.date, r.date))
        .collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, r) in xs.iter().zip(records) {
        sxy += (x - x_mean) * (r.value - mean);
        sxx += (x - x_mean) * (x - x_mean);
    }
    let slope_per_year = if sxx > 0.0 { sxy / sxx } else { 0.0 };

    Ok(SeriesSummary {
        months: records.len(),
        mean,
        min,
        max,
        slope_per_year,
        threshold,
        bloom_frequency_pct: 100.0 * above as f64 / n,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/series/stats.rs"]
mod tests;
