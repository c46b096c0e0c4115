//! CorrelationEngine: backward-walking windowed Pearson correlation.
//!
//! Windows are aligned to calendar-month boundaries. Starting from the first
//! day of the current month, each step covers `[end - N months, end]`
//! (inclusive) and the next window ends where this one starts. The walk
//! stops once a window would start before the first joined date.
//!
//! A window whose slice is empty, constant on either side, or otherwise has
//! an undefined coefficient emits nothing, and the walk still advances by N
//! months.

use super::align::{inner_join, AlignedTable};
use super::source::SeriesSource;
use super::stats::{pearson, round4};
use crate::domain::{AssetKey, Period};
use crate::error::{CycleError, CycleResult};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One emitted window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPoint {
    /// Window end (always the first day of a month).
    pub date: NaiveDate,
    /// Pearson coefficient rounded to 4 decimals, within `[-1, 1]`.
    pub correlation: f64,
}

/// Walk windows over a two-column aligned table.
///
/// `as_of` fixes "the current month". Output is ascending by date.
pub fn sliding_correlation(table: &AlignedTable, period: Period, as_of: NaiveDate) -> Vec<CorrelationPoint> {
    let (Some(&min_date), [left, right]) = (table.dates.first(), table.columns.as_slice()) else {
        return Vec::new();
    };
    let Some(mut window_end) = as_of.with_day(1) else {
        return Vec::new();
    };
    let step = Months::new(period.months());

    let mut points = Vec::new();
    while let Some(window_start) = window_end.checked_sub_months(step) {
        if window_start < min_date {
            break;
        }

        let lo = table.dates.partition_point(|d| *d < window_start);
        let hi = table.dates.partition_point(|d| *d <= window_end);

        match pearson(&left.values[lo..hi], &right.values[lo..hi]) {
            Some(r) => points.push(CorrelationPoint {
                date: window_end,
                correlation: round4(r).clamp(-1.0, 1.0),
            }),
            None => debug!(%window_start, %window_end, rows = hi - lo, "skipping degenerate window"),
        }

        window_end = window_start;
    }

    points.reverse();
    points
}

/// Computes sliding correlation series between two assets of the latest snapshot.
pub struct CorrelationEngine<'a> {
    source: &'a dyn SeriesSource,
}

impl<'a> CorrelationEngine<'a> {
    pub fn new(source: &'a dyn SeriesSource) -> Self {
        Self { source }
    }

    /// Query-surface entry point; "today" is the local current date.
    pub fn get_sliding_correlation(
        &self,
        asset1: &str,
        asset2: &str,
        period: &str,
    ) -> CycleResult<Vec<CorrelationPoint>> {
        self.get_sliding_correlation_as_of(asset1, asset2, period, chrono::Local::now().date_naive())
    }

    /// Same as `get_sliding_correlation` with an explicit current date.
    ///
    /// Period and asset keys are validated before any storage access.
    pub fn get_sliding_correlation_as_of(
        &self,
        asset1: &str,
        asset2: &str,
        period: &str,
        as_of: NaiveDate,
    ) -> CycleResult<Vec<CorrelationPoint>> {
        let period: Period = period.parse()?;
        let asset1: AssetKey = asset1.parse()?;
        let asset2: AssetKey = asset2.parse()?;
        self.series_for(asset1, asset2, period, as_of)
    }

    pub fn series_for(
        &self,
        asset1: AssetKey,
        asset2: AssetKey,
        period: Period,
        as_of: NaiveDate,
    ) -> CycleResult<Vec<CorrelationPoint>> {
        let key = self.source.latest_snapshot_key()?;
        let first = self.source.load_series(&key, asset1)?;
        let second = self.source.load_series(&key, asset2)?;

        let mut joined = inner_join(&[first.as_ref(), second.as_ref()]);
        if joined.columns.len() != 2 {
            return Err(CycleError::storage("inner join did not produce two columns"));
        }
        joined.forward_fill_columns();

        let points = sliding_correlation(&joined, period, as_of);
        debug!(
            snapshot = %key,
            %asset1,
            %asset2,
            %period,
            joined_rows = joined.len(),
            points = points.len(),
            "sliding correlation"
        );
        Ok(points)
    }
}
