use chrono::NaiveDate;

use crate::foundation::error::{LakebloomError, LakebloomResult};

/// One monthly observation of the lake-wide chlorophyll-a mean.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeSeriesRecord {
    /// First day of the month the value represents.
    pub date: NaiveDate,
    /// Mean chlorophyll-a (mg/m³).
    pub value: f64,
    /// Spatial standard deviation, when the export carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
}

impl TimeSeriesRecord {
    /// Record without a spread value.
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value,
            std: None,
        }
    }
}

/// Timestamps of `records`, in record order.
pub fn timestamps(records: &[TimeSeriesRecord]) -> Vec<NaiveDate> {
    records.iter().map(|r| r.date).collect()
}

/// Every `step`-th timestamp starting with the first one.
pub fn sample_timestamps(
    records: &[TimeSeriesRecord],
    step: usize,
) -> LakebloomResult<Vec<NaiveDate>> {
    if step == 0 {
        return Err(LakebloomError::invalid_parameter(
            "frame sampling step must be >= 1 month, got 0",
        ));
    }
    Ok(records.iter().step_by(step).map(|r| r.date).collect())
}

#[cfg(test)]
#[path = "../../tests/unit/series/record.rs"]
mod tests;
