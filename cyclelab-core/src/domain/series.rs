//! AssetSeries: one asset's daily value history.

use super::asset::AssetKey;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single `(date, value)` observation.
///
/// A NaN value marks a missing observation (an empty cell in a snapshot
/// file). The engines treat it as a gap and forward-fill over it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_nan()
    }
}

/// An asset's value history, sorted ascending by date.
///
/// Series produced by ingestion cover `[EPOCH, today]` with one point per
/// calendar day. Series read back from a snapshot are only guaranteed to be
/// sorted; files written by other tools may be ragged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    pub asset: AssetKey,
    pub points: Vec<SeriesPoint>,
}

impl AssetSeries {
    pub fn new(asset: AssetKey, points: Vec<SeriesPoint>) -> Self {
        Self { asset, points }
    }

    /// Build a contiguous daily series starting at `start`.
    pub fn from_daily_values(asset: AssetKey, start: NaiveDate, values: &[f64]) -> Self {
        let points = values
            .iter()
            .zip(start.iter_days())
            .map(|(&value, date)| SeriesPoint { date, value })
            .collect();
        Self { asset, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// True when dates increase by exactly one day with no duplicates.
    pub fn is_contiguous_daily(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[0].date.checked_add_days(Days::new(1)) == Some(w[1].date))
    }
}
