//! Normalization of raw provider frames onto the canonical daily calendar.
//!
//! Two steps, applied by the ingestor in order:
//! 1. `reduce_frame` picks the asset's value column out of a multi-column
//!    provider frame and drops null cells.
//! 2. `reindex_daily` lays the observations onto every calendar day in
//!    `[start, end]`, forward-filling from the most recent earlier observation
//!    and filling days before the first observation with `0`.

use super::provider::{ProviderError, RawFrame};
use crate::domain::{AssetKey, AssetSeries, SeriesPoint};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Reduce a provider frame to `(date, value)` observations.
///
/// Fails with `ResponseFormatChanged` when the column is absent and with
/// `EmptyPayload` when it holds no usable value.
pub fn reduce_frame(
    frame: &RawFrame,
    column: &str,
    symbol: &str,
) -> Result<Vec<(NaiveDate, f64)>, ProviderError> {
    let col = frame.column(column).ok_or_else(|| {
        ProviderError::ResponseFormatChanged(format!("no '{column}' column in response for {symbol}"))
    })?;

    if col.values.len() != frame.dates.len() {
        return Err(ProviderError::ResponseFormatChanged(format!(
            "column '{column}' has {} values for {} dates",
            col.values.len(),
            frame.dates.len()
        )));
    }

    let observations: Vec<(NaiveDate, f64)> = frame
        .dates
        .iter()
        .zip(&col.values)
        .filter_map(|(date, value)| value.filter(|v| v.is_finite()).map(|v| (*date, v)))
        .collect();

    if observations.is_empty() {
        return Err(ProviderError::EmptyPayload {
            symbol: symbol.to_string(),
        });
    }
    Ok(observations)
}

/// Reindex observations onto every day of `[start, end]`.
///
/// Observations outside the range are ignored; a later duplicate for the
/// same date replaces an earlier one. Returns an empty series when
/// `end < start`.
pub fn reindex_daily(
    asset: AssetKey,
    observations: &[(NaiveDate, f64)],
    start: NaiveDate,
    end: NaiveDate,
) -> AssetSeries {
    let by_date: BTreeMap<NaiveDate, f64> = observations
        .iter()
        .filter(|(date, _)| *date >= start && *date <= end)
        .copied()
        .collect();

    let mut points = Vec::new();
    let mut last = 0.0;
    for date in start.iter_days().take_while(|d| *d <= end) {
        if let Some(&v) = by_date.get(&date) {
            last = v;
        }
        points.push(SeriesPoint { date, value: last });
    }

    AssetSeries::new(asset, points)
}
