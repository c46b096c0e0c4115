//! Integration tests for the table and correlation engines over a real snapshot store.

use chrono::NaiveDate;
use cyclelab_core::analytics::{CorrelationEngine, ResampleEngine, SeriesSource};
use cyclelab_core::data::{SnapshotKey, SnapshotStore};
use cyclelab_core::domain::{AssetKey, AssetSeries};
use cyclelab_core::CycleResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn store_with(series: &[AssetSeries]) -> (TempDir, SnapshotStore) {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let key: SnapshotKey = "20240701".parse().unwrap();
    for s in series {
        store.write_series(&key, s).unwrap();
    }
    (dir, store)
}

/// Counts every storage access; used to prove validation happens first.
struct CountingSource<'a> {
    inner: &'a SnapshotStore,
    hits: AtomicUsize,
}

impl SeriesSource for CountingSource<'_> {
    fn latest_snapshot_key(&self) -> CycleResult<SnapshotKey> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.inner.latest_snapshot_key()
    }

    fn load_series(&self, key: &SnapshotKey, asset: AssetKey) -> CycleResult<Arc<AssetSeries>> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        SeriesSource::load_series(self.inner, key, asset)
    }
}

// ── Table ──

#[test]
fn monthly_table_holds_one_mean_per_month() {
    let values: Vec<f64> = (0..91).map(|i| i as f64).collect(); // 2024-01-01 .. 2024-03-31
    let (_dir, store) = store_with(&[AssetSeries::from_daily_values(AssetKey::Sp500, d(2024, 1, 1), &values)]);

    let table = ResampleEngine::new(&store).get_table(&["sp500"], "monthly").unwrap();

    let dates: Vec<NaiveDate> = table.rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 31)]);
    assert_eq!(table.value(0, AssetKey::Sp500), Some(15.0));
    assert_eq!(table.value(1, AssetKey::Sp500), Some(45.0));
    assert_eq!(table.value(2, AssetKey::Sp500), Some(75.0));
}

#[test]
fn weekly_rows_are_labelled_by_week_ending_sunday() {
    // 2024-01-01 is a Monday
    let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let (_dir, store) = store_with(&[AssetSeries::from_daily_values(AssetKey::Gold, d(2024, 1, 1), &values)]);

    let table = ResampleEngine::new(&store).get_table(&["gold"], "weekly").unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0].date, d(2024, 1, 7));
    assert_eq!(table.value(0, AssetKey::Gold), Some(3.0));
    assert_eq!(table.rows[1].date, d(2024, 1, 14));
    assert_eq!(table.value(1, AssetKey::Gold), Some(8.0));
}

#[test]
fn daily_table_reproduces_stored_series() {
    let values = [3.5, 4.0, 4.25, 4.0, 3.75];
    let series = AssetSeries::from_daily_values(AssetKey::Bitcoin, d(2024, 6, 1), &values);
    let (_dir, store) = store_with(&[series.clone()]);

    let table = ResampleEngine::new(&store).get_table(&["bitcoin"], "daily").unwrap();

    assert_eq!(table.len(), series.len());
    for (row, point) in table.rows.iter().zip(&series.points) {
        assert_eq!(row.date, point.date);
        assert_eq!(row.values, vec![Some(point.value)]);
    }
}

#[test]
fn outer_join_leaves_late_starters_empty_until_first_value() {
    let (_dir, store) = store_with(&[
        AssetSeries::from_daily_values(AssetKey::Sp500, d(2024, 1, 1), &[1.0, 2.0, 3.0, 4.0]),
        AssetSeries::from_daily_values(AssetKey::Kospi, d(2024, 1, 3), &[30.0]),
    ]);

    let table = ResampleEngine::new(&store)
        .get_table(&["sp500", "kospi", "sp500"], "daily")
        .unwrap();

    assert_eq!(table.columns, vec![AssetKey::Sp500, AssetKey::Kospi]);
    assert_eq!(table.len(), 4);
    assert_eq!(table.value(0, AssetKey::Kospi), None);
    assert_eq!(table.value(1, AssetKey::Kospi), None);
    assert_eq!(table.value(2, AssetKey::Kospi), Some(30.0));
    // Carried forward past its own last date
    assert_eq!(table.value(3, AssetKey::Kospi), Some(30.0));

    let records = table.to_records();
    assert_eq!(records[0]["date"], "2024-01-01");
    assert!(records[0]["kospi"].is_null());
    assert_eq!(records[3]["sp500"], 4.0);
}

#[test]
fn empty_key_list_yields_empty_table_without_storage_access() {
    let (_dir, store) = store_with(&[]);
    let source = CountingSource {
        inner: &store,
        hits: AtomicUsize::new(0),
    };

    let table = ResampleEngine::new(&source).get_table::<&str>(&[], "weekly").unwrap();
    assert!(table.is_empty());
    assert!(table.to_records().is_empty());
    assert_eq!(source.hits.load(Ordering::SeqCst), 0);
}

#[test]
fn invalid_table_input_is_rejected_before_storage_access() {
    let (_dir, store) = store_with(&[]);
    let source = CountingSource {
        inner: &store,
        hits: AtomicUsize::new(0),
    };
    let engine = ResampleEngine::new(&source);

    assert!(engine.get_table(&["sp500", "doge"], "daily").unwrap_err().is_validation());
    assert!(engine.get_table(&["sp500"], "yearly").unwrap_err().is_validation());
    assert_eq!(source.hits.load(Ordering::SeqCst), 0);
}

#[test]
fn table_for_asset_missing_from_snapshot_is_not_found() {
    let (_dir, store) = store_with(&[AssetSeries::from_daily_values(AssetKey::Sp500, d(2024, 1, 1), &[1.0])]);

    let err = ResampleEngine::new(&store).get_table(&["sp500", "gold"], "daily").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn table_without_any_snapshot_is_not_found() {
    let (_dir, store) = store_with(&[]);
    let err = ResampleEngine::new(&store).get_table(&["sp500"], "daily").unwrap_err();
    assert!(err.is_not_found());
}

// ── Correlation ──

#[test]
fn anti_correlated_series_give_minus_one_everywhere() {
    let up: Vec<f64> = (0..180).map(|i| i as f64).collect();
    let down: Vec<f64> = (1..=180).rev().map(|i| i as f64).collect();
    let (_dir, store) = store_with(&[
        AssetSeries::from_daily_values(AssetKey::Sp500, d(2024, 1, 1), &up),
        AssetSeries::from_daily_values(AssetKey::Gold, d(2024, 1, 1), &down),
    ]);

    let points = CorrelationEngine::new(&store)
        .get_sliding_correlation_as_of("sp500", "gold", "1개월", d(2024, 7, 15))
        .unwrap();

    let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    assert_eq!(
        dates,
        vec![
            d(2024, 2, 1),
            d(2024, 3, 1),
            d(2024, 4, 1),
            d(2024, 5, 1),
            d(2024, 6, 1),
            d(2024, 7, 1)
        ]
    );
    for p in &points {
        assert!((p.correlation + 1.0).abs() < 1e-9, "{p:?}");
    }
}

#[test]
fn longer_period_steps_back_by_its_month_count() {
    let a: Vec<f64> = (0..400).map(|i| ((i as f64) * 0.1).sin()).collect();
    let b: Vec<f64> = (0..400).map(|i| ((i as f64) * 0.1).sin() + (i as f64) * 0.01).collect();
    let (_dir, store) = store_with(&[
        AssetSeries::from_daily_values(AssetKey::Bitcoin, d(2023, 6, 1), &a),
        AssetSeries::from_daily_values(AssetKey::Kospi, d(2023, 6, 1), &b),
    ]);

    let points = CorrelationEngine::new(&store)
        .get_sliding_correlation_as_of("bitcoin", "kospi", "3개월", d(2024, 7, 2))
        .unwrap();

    let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![d(2023, 10, 1), d(2024, 1, 1), d(2024, 4, 1), d(2024, 7, 1)]);
    for p in &points {
        assert!((-1.0..=1.0).contains(&p.correlation));
        assert_eq!(p.correlation, (p.correlation * 10_000.0).round() / 10_000.0);
    }
}

#[test]
fn correlation_uses_only_shared_dates() {
    // gold starts a month later; the first window would begin before the shared range
    let x: Vec<f64> = (0..120).map(|i| i as f64).collect();
    let (_dir, store) = store_with(&[
        AssetSeries::from_daily_values(AssetKey::Sp500, d(2024, 1, 1), &x),
        AssetSeries::from_daily_values(AssetKey::Gold, d(2024, 2, 1), &x),
    ]);

    let points = CorrelationEngine::new(&store)
        .get_sliding_correlation_as_of("sp500", "gold", "1개월", d(2024, 5, 20))
        .unwrap();

    let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![d(2024, 3, 1), d(2024, 4, 1), d(2024, 5, 1)]);
}

#[test]
fn invalid_correlation_input_is_rejected_before_storage_access() {
    let (_dir, store) = store_with(&[]);
    let source = CountingSource {
        inner: &store,
        hits: AtomicUsize::new(0),
    };
    let engine = CorrelationEngine::new(&source);
    let today = d(2024, 7, 1);

    assert!(engine
        .get_sliding_correlation_as_of("sp500", "gold", "12개월", today)
        .unwrap_err()
        .is_validation());
    assert!(engine
        .get_sliding_correlation_as_of("sp500", "silver", "1개월", today)
        .unwrap_err()
        .is_validation());
    assert_eq!(source.hits.load(Ordering::SeqCst), 0);
}

#[test]
fn correlation_point_serializes_as_date_and_value() {
    let x: Vec<f64> = (0..70).map(|i| i as f64).collect();
    let (_dir, store) = store_with(&[
        AssetSeries::from_daily_values(AssetKey::Sp500, d(2024, 1, 1), &x),
        AssetSeries::from_daily_values(AssetKey::Gold, d(2024, 1, 1), &x),
    ]);

    let points = CorrelationEngine::new(&store)
        .get_sliding_correlation_as_of("sp500", "gold", "1개월", d(2024, 3, 3))
        .unwrap();
    let json = serde_json::to_value(&points).unwrap();
    assert_eq!(json[0]["date"], "2024-02-01");
    assert_eq!(json[0]["correlation"], 1.0);
}
