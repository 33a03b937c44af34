use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    foundation::error::{LakebloomError, LakebloomResult},
    foundation::fs::write_atomically,
    series::record::TimeSeriesRecord,
    series::synth::{SeriesParams, synthesize_series},
};

/// Column holding the month (`YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM`).
pub const DATE_COLUMN: &str = "date";
/// Column holding the monthly mean concentration.
pub const VALUE_COLUMN: &str = "mean_chla";
/// Optional column holding the spatial standard deviation.
pub const STD_COLUMN: &str = "std_chla";

/// Where a series came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOrigin {
    /// Parsed from a persisted file.
    Loaded,
    /// Generated from [`SeriesParams`] and persisted.
    Synthesized,
}

/// Result of [`load_or_synthesize`].
#[derive(Clone, Debug)]
pub struct LoadedSeries {
    /// Records in file (or generation) order.
    pub records: Vec<TimeSeriesRecord>,
    /// Whether the records were read or generated this run.
    pub origin: SeriesOrigin,
    /// `true` when the records are demo data, including a reload of a series generated earlier.
    pub synthetic: bool,
    /// File the records were read from or written to.
    pub path: PathBuf,
}

impl LoadedSeries {
    /// Return `true` when the records are demo data.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// Sidecar written next to a generated series so later loads still know it is demo data.
pub fn synthetic_marker_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".synthetic");
    PathBuf::from(name)
}

/// Load the series persisted at `path`, or synthesize and persist one when the file is absent.
///
/// A file that exists but cannot be parsed is an error; it is never replaced by synthetic data.
/// A generated series is persisted together with its [`synthetic_marker_path`] sidecar.
#[tracing::instrument(skip(path, params), fields(path = %path.display()))]
pub fn load_or_synthesize(path: &Path, params: &SeriesParams) -> LakebloomResult<LoadedSeries> {
    if path.exists() {
        let records = read_series_csv(path)?;
        let synthetic = synthetic_marker_path(path).is_file();
        tracing::info!(months = records.len(), synthetic, "loaded persisted series");
        return Ok(LoadedSeries {
            records,
            origin: SeriesOrigin::Loaded,
            synthetic,
            path: path.to_path_buf(),
        });
    }

    tracing::info!("no series found, synthesizing demo data");
    let records = synthesize_series(params)?;
    // Marker first: a crash before the CSV lands leaves nothing that loads as real data.
    write_synthetic_marker(path, params)?;
    write_series_csv(path, &records)?;
    tracing::info!(months = records.len(), "synthetic series written");
    Ok(LoadedSeries {
        records,
        origin: SeriesOrigin::Synthesized,
        synthetic: true,
        path: path.to_path_buf(),
    })
}

fn write_synthetic_marker(path: &Path, params: &SeriesParams) -> LakebloomResult<()> {
    let marker = synthetic_marker_path(path);
    let body = format!(
        "synthetic demo series generated by lakebloom {} with seed {}\n",
        env!("CARGO_PKG_VERSION"),
        params.seed
    );
    write_atomically(&marker, |tmp| {
        std::fs::write(tmp, body.as_bytes())
            .with_context(|| format!("failed to write '{}'", tmp.display()))?;
        Ok(())
    })
}

/// Parse a persisted series.
///
/// Columns are looked up by header name, so exports carrying extra columns load unchanged. Records
/// are returned in file order.
pub fn read_series_csv(path: &Path) -> LakebloomResult<Vec<TimeSeriesRecord>> {
    if !path.exists() {
        return Err(LakebloomError::not_found(path));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            LakebloomError::data_format(format!("cannot open '{}': {e}", path.display()))
        })?;

    let headers = reader
        .headers()
        .map_err(|e| {
            LakebloomError::data_format(format!("cannot read header of '{}': {e}", path.display()))
        })?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let date_idx = column(DATE_COLUMN).ok_or_else(|| {
        LakebloomError::data_format(format!(
            "'{}' has no '{DATE_COLUMN}' column",
            path.display()
        ))
    })?;
    let value_idx = column(VALUE_COLUMN).ok_or_else(|| {
        LakebloomError::data_format(format!(
            "'{}' has no '{VALUE_COLUMN}' column",
            path.display()
        ))
    })?;
    let std_idx = column(STD_COLUMN);

    let mut out = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| {
            LakebloomError::data_format(format!("malformed row in '{}': {e}", path.display()))
        })?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let raw_date = field(date_idx);
        let date = parse_month(raw_date).ok_or_else(|| {
            LakebloomError::data_format(format!(
                "'{}' line {line}: unparseable date '{raw_date}'",
                path.display()
            ))
        })?;

        let raw_value = field(value_idx);
        let value = parse_number(raw_value).ok_or_else(|| {
            LakebloomError::data_format(format!(
                "'{}' line {line}: non-numeric {VALUE_COLUMN} '{raw_value}'",
                path.display()
            ))
        })?;

        let std = match std_idx.map(field) {
            None | Some("") => None,
            Some(raw) => Some(parse_number(raw).ok_or_else(|| {
                LakebloomError::data_format(format!(
                    "'{}' line {line}: non-numeric {STD_COLUMN} '{raw}'",
                    path.display()
                ))
            })?),
        };

        out.push(TimeSeriesRecord { date, value, std });
    }

    if out.is_empty() {
        return Err(LakebloomError::data_format(format!(
            "'{}' contains no records",
            path.display()
        )));
    }
    Ok(out)
}

/// Persist `records` as CSV.
///
/// The file is written to a sibling and renamed into place, so readers never observe a partial
/// series.
pub fn write_series_csv(path: &Path, records: &[TimeSeriesRecord]) -> LakebloomResult<()> {
    let with_std = records.iter().any(|r| r.std.is_some());
    write_atomically(path, |tmp| {
        let mut w = csv::Writer::from_path(tmp)
            .with_context(|| format!("failed to create '{}'", tmp.display()))?;
        let write_err = |e: csv::Error| {
            LakebloomError::Other(anyhow::anyhow!("failed to write '{}': {e}", tmp.display()))
        };

        if with_std {
            w.write_record([DATE_COLUMN, VALUE_COLUMN, STD_COLUMN])
                .map_err(write_err)?;
        } else {
            w.write_record([DATE_COLUMN, VALUE_COLUMN])
                .map_err(write_err)?;
        }

        for r in records {
            let date = r.date.format("%Y-%m-%d").to_string();
            let value = r.value.to_string();
            if with_std {
                let std = r.std.map(|s| s.to_string()).unwrap_or_default();
                w.write_record([date, value, std]).map_err(write_err)?;
            } else {
                w.write_record([date, value]).map_err(write_err)?;
            }
        }
        w.flush()
            .with_context(|| format!("failed to flush '{}'", tmp.display()))?;
        Ok(())
    })
}

/// Parse a month from the formats written by pandas, this crate, and GEE exports.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
#[path = "../../tests/unit/series/store.rs"]
mod tests;
