//! Multi-series date alignment.
//!
//! Joining and filling are separate steps: a join leaves NaN where a series
//! has no value, and `forward_fill_columns` then fills each column from its
//! own history only. A single fill across the whole table would leak one
//! asset's values into another's gaps.

use crate::domain::{AssetKey, AssetSeries};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// One asset's values on the table's date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedColumn {
    pub asset: AssetKey,
    pub values: Vec<f64>,
}

/// Series aligned to a common ascending date axis.
///
/// Every column has the same length as `dates`; NaN marks a missing value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignedTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<AlignedColumn>,
}

impl AlignedTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, asset: AssetKey) -> Option<&AlignedColumn> {
        self.columns.iter().find(|c| c.asset == asset)
    }

    /// Forward-fill every column independently.
    pub fn forward_fill_columns(&mut self) {
        for column in &mut self.columns {
            forward_fill(&mut column.values);
        }
    }
}

/// Replace each NaN with the closest earlier non-NaN value.
///
/// Leading NaNs stay NaN.
pub fn forward_fill(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
}

/// Date → value lookup; a later duplicate date wins.
fn index_by_date(series: &AssetSeries) -> BTreeMap<NaiveDate, f64> {
    series.points.iter().map(|p| (p.date, p.value)).collect()
}

fn build(dates: Vec<NaiveDate>, series: &[&AssetSeries]) -> AlignedTable {
    let columns = series
        .iter()
        .map(|s| {
            let by_date = index_by_date(s);
            AlignedColumn {
                asset: s.asset,
                values: dates
                    .iter()
                    .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                    .collect(),
            }
        })
        .collect();
    AlignedTable { dates, columns }
}

/// Outer join: the union of all dates, NaN where a series has no point.
pub fn outer_join(series: &[&AssetSeries]) -> AlignedTable {
    let dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.date))
        .collect();
    build(dates.into_iter().collect(), series)
}

/// Inner join: only dates present in every series.
pub fn inner_join(series: &[&AssetSeries]) -> AlignedTable {
    let mut sets = series
        .iter()
        .map(|s| s.points.iter().map(|p| p.date).collect::<BTreeSet<_>>());
    let Some(first) = sets.next() else {
        return AlignedTable::default();
    };
    let dates = sets.fold(first, |acc, set| acc.intersection(&set).copied().collect());
    build(dates.into_iter().collect(), series)
}
