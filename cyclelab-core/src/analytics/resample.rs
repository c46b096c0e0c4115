//! ResampleEngine: aligned multi-asset tables at daily, weekly or monthly resolution.
//!
//! Pipeline: load every requested series from the latest snapshot, outer-join
//! on date, forward-fill each column on its own, then bucket.
//!
//! Buckets are labelled with their closing boundary: the Sunday that ends the
//! ISO week, or the last day of the calendar month. Each bucket row holds
//! the per-column mean of the finite daily values inside it.

use super::align::{outer_join, AlignedTable};
use super::source::SeriesSource;
use super::stats::mean_finite;
use crate::domain::{AssetKey, Resolution};
use crate::error::CycleResult;
use chrono::{Datelike, Days, Months, NaiveDate};
use polars::prelude::*;
use serde_json::{Map, Value};
use tracing::debug;

/// One output row: a date plus one value per requested asset.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub date: NaiveDate,
    /// Parallel to `ResampledTable::columns`; `None` where the asset has no value yet.
    pub values: Vec<Option<f64>>,
}

/// Result of a table query. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledTable {
    pub resolution: Resolution,
    pub columns: Vec<AssetKey>,
    pub rows: Vec<TableRow>,
}

impl ResampledTable {
    pub fn empty(resolution: Resolution) -> Self {
        Self {
            resolution,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, row: usize, asset: AssetKey) -> Option<f64> {
        let col = self.columns.iter().position(|c| *c == asset)?;
        self.rows.get(row)?.values.get(col).copied().flatten()
    }

    /// Row records as served to the API layer:
    /// `{"date": "YYYY-MM-DD", "<asset>": number | null, ...}`.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                record.insert(
                    "date".into(),
                    Value::String(row.date.format("%Y-%m-%d").to_string()),
                );
                for (asset, value) in self.columns.iter().zip(&row.values) {
                    let json = value
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null);
                    record.insert(asset.as_str().to_string(), json);
                }
                record
            })
            .collect()
    }

    /// Polars view with a `date` column plus one Float64 column per asset.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let day_zero = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH.date_naive();
        let days: Vec<i32> = self
            .rows
            .iter()
            .map(|r| (r.date - day_zero).num_days() as i32)
            .collect();

        let mut columns = vec![Column::new("date".into(), days).cast(&DataType::Date)?];
        for (i, asset) in self.columns.iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|r| r.values.get(i).copied().flatten())
                .collect();
            columns.push(Column::new(asset.as_str().into(), values));
        }
        DataFrame::new(columns)
    }
}

/// Closing boundary of the bucket holding `date`.
pub fn bucket_end(date: NaiveDate, resolution: Resolution) -> NaiveDate {
    match resolution {
        Resolution::Daily => date,
        Resolution::Weekly => {
            let to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
            date.checked_add_days(Days::new(to_sunday)).unwrap_or(date)
        }
        Resolution::Monthly => date
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date),
    }
}

fn nan_to_none(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

/// Bucket an aligned, filled table.
///
/// `Daily` passes rows through unchanged. Only buckets that contain at
/// least one row are emitted.
pub fn resample(table: &AlignedTable, resolution: Resolution) -> Vec<TableRow> {
    if resolution == Resolution::Daily {
        return (0..table.len())
            .map(|i| TableRow {
                date: table.dates[i],
                values: table.columns.iter().map(|c| nan_to_none(c.values[i])).collect(),
            })
            .collect();
    }

    let mut rows = Vec::new();
    let mut start = 0;
    while start < table.len() {
        let label = bucket_end(table.dates[start], resolution);
        let end = start + table.dates[start..].partition_point(|d| *d <= label);
        rows.push(TableRow {
            date: label,
            values: table
                .columns
                .iter()
                .map(|c| mean_finite(&c.values[start..end]))
                .collect(),
        });
        start = end;
    }
    rows
}

/// Produces aligned, resolution-adjusted tables from the latest snapshot.
pub struct ResampleEngine<'a> {
    source: &'a dyn SeriesSource,
}

impl<'a> ResampleEngine<'a> {
    pub fn new(source: &'a dyn SeriesSource) -> Self {
        Self { source }
    }

    /// Query-surface entry point taking raw strings.
    ///
    /// The resolution and every key are validated before any storage access.
    /// Duplicate keys collapse to their first occurrence.
    pub fn get_table<S: AsRef<str>>(
        &self,
        asset_keys: &[S],
        resolution: &str,
    ) -> CycleResult<ResampledTable> {
        let resolution: Resolution = resolution.parse()?;
        let assets = AssetKey::parse_all(asset_keys)?;
        self.table_for(&assets, resolution)
    }

    pub fn table_for(&self, assets: &[AssetKey], resolution: Resolution) -> CycleResult<ResampledTable> {
        let mut columns: Vec<AssetKey> = Vec::with_capacity(assets.len());
        for asset in assets {
            if !columns.contains(asset) {
                columns.push(*asset);
            }
        }

        if columns.is_empty() {
            return Ok(ResampledTable::empty(resolution));
        }

        let key = self.source.latest_snapshot_key()?;
        let loaded = columns
            .iter()
            .map(|asset| self.source.load_series(&key, *asset))
            .collect::<CycleResult<Vec<_>>>()?;

        let refs: Vec<_> = loaded.iter().map(|s| s.as_ref()).collect();
        let mut joined = outer_join(&refs);
        joined.forward_fill_columns();

        let rows = resample(&joined, resolution);
        debug!(snapshot = %key, %resolution, rows = rows.len(), "built table");
        Ok(ResampledTable {
            resolution,
            columns,
            rows,
        })
    }
}
