//! Integration tests for the CSV snapshot store.

use chrono::NaiveDate;
use cyclelab_core::data::{DataSource, SnapshotKey, SnapshotStore};
use cyclelab_core::domain::{AssetKey, AssetSeries};
use std::fs;
use tempfile::TempDir;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn key(s: &str) -> SnapshotKey {
    s.parse().unwrap()
}

#[test]
fn written_series_reads_back_identically() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let series = AssetSeries::from_daily_values(AssetKey::Bitcoin, d(2024, 2, 27), &[1.5, 2.25, 3.0, 4.125]);

    store.write_series(&key("20240301"), &series).unwrap();
    let back = store.read_series(&key("20240301"), AssetKey::Bitcoin).unwrap();

    assert_eq!(back, series);
}

#[test]
fn file_layout_is_dated_dir_with_one_csv_per_asset() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let series = AssetSeries::from_daily_values(AssetKey::Kospi, d(2024, 1, 1), &[10.0, 11.0]);

    store
        .write_series_from(&key("20240102"), &series, Some(DataSource::YahooFinance))
        .unwrap();

    let csv = fs::read_to_string(dir.path().join("20240102").join("kospi.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("date,kospi"));
    assert_eq!(lines.next(), Some("2024-01-01,10"));
    assert_eq!(lines.next(), Some("2024-01-02,11"));

    let meta = store.read_meta(&key("20240102"), AssetKey::Kospi).unwrap();
    assert_eq!(meta.row_count, 2);
    assert_eq!(meta.start_date, Some(d(2024, 1, 1)));
    assert_eq!(meta.end_date, Some(d(2024, 1, 2)));
    assert_eq!(meta.source, Some(DataSource::YahooFinance));
}

#[test]
fn latest_key_is_lexicographic_max() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let series = AssetSeries::from_daily_values(AssetKey::Gold, d(2024, 1, 1), &[1.0]);

    for k in ["20240101", "20240525", "20240415"] {
        store.write_series(&key(k), &series).unwrap();
    }

    assert_eq!(store.latest_snapshot_key().unwrap(), key("20240525"));
    let keys: Vec<String> = store
        .list_snapshot_keys()
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(keys, vec!["20240101", "20240415", "20240525"]);
}

#[test]
fn latest_key_ignores_foreign_and_empty_dirs() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let series = AssetSeries::from_daily_values(AssetKey::Gold, d(2024, 1, 1), &[1.0]);
    store.write_series(&key("20240101"), &series).unwrap();

    fs::create_dir_all(dir.path().join("20991231")).unwrap();
    fs::create_dir_all(dir.path().join("scratch")).unwrap();
    fs::create_dir_all(dir.path().join("2024011")).unwrap();
    fs::write(dir.path().join("2024011").join("gold.csv"), "date,gold\n").unwrap();

    assert_eq!(store.latest_snapshot_key().unwrap(), key("20240101"));
}

#[test]
fn no_snapshots_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("never_created"));

    assert!(store.list_snapshot_keys().unwrap().is_empty());
    assert!(store.latest_snapshot_key().unwrap_err().is_not_found());
}

#[test]
fn missing_asset_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let series = AssetSeries::from_daily_values(AssetKey::Gold, d(2024, 1, 1), &[1.0]);
    store.write_series(&key("20240101"), &series).unwrap();

    let err = store.read_series(&key("20240101"), AssetKey::Sp500).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.list_assets(&key("20240101")).unwrap(), vec![AssetKey::Gold]);
}

#[test]
fn empty_value_cells_read_as_missing() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let snap = dir.path().join("20240105");
    fs::create_dir_all(&snap).unwrap();
    fs::write(
        snap.join("us_interest.csv"),
        "date,us_interest\n2024-01-02,\n2024-01-01,5.33\n",
    )
    .unwrap();

    let series = store.read_series(&key("20240105"), AssetKey::UsInterest).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series.points[0].date, d(2024, 1, 1));
    assert_eq!(series.points[0].value, 5.33);
    assert!(series.points[1].is_missing());
}

#[test]
fn overwrite_replaces_file_and_leaves_no_temp() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let first = AssetSeries::from_daily_values(AssetKey::RealEstate, d(2024, 1, 1), &[1.0, 2.0]);
    let second = AssetSeries::from_daily_values(AssetKey::RealEstate, d(2024, 1, 1), &[3.0]);

    store.write_series(&key("20240102"), &first).unwrap();
    store.write_series(&key("20240102"), &second).unwrap();

    assert_eq!(store.read_series(&key("20240102"), AssetKey::RealEstate).unwrap(), second);
    let leftovers: Vec<_> = fs::read_dir(dir.path().join("20240102"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn sidecar_failure_does_not_fail_the_written_series() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let series = AssetSeries::from_daily_values(AssetKey::Gold, d(2024, 1, 1), &[1.0, 2.0, 3.0]);
    // A directory squatting on the sidecar path makes the final rename fail
    fs::create_dir_all(dir.path().join("20240103").join("gold.meta.json")).unwrap();

    let meta = store
        .write_series_from(&key("20240103"), &series, Some(DataSource::YahooFinance))
        .unwrap();

    assert_eq!(meta.row_count, 3);
    assert_eq!(store.read_series(&key("20240103"), AssetKey::Gold).unwrap(), series);
    assert!(store.read_meta(&key("20240103"), AssetKey::Gold).is_none());
    let leftovers: Vec<_> = fs::read_dir(dir.path().join("20240103"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn overwrite_refreshes_the_sidecar_hash() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let first = AssetSeries::from_daily_values(AssetKey::Sp500, d(2024, 1, 1), &[1.0, 2.0]);
    let second = AssetSeries::from_daily_values(AssetKey::Sp500, d(2024, 1, 1), &[1.0, 2.5]);

    let a = store.write_series(&key("20240102"), &first).unwrap();
    let b = store.write_series(&key("20240102"), &second).unwrap();

    assert_ne!(a.data_hash, b.data_hash);
    let on_disk = store.read_meta(&key("20240102"), AssetKey::Sp500).unwrap();
    assert_eq!(on_disk.data_hash, b.data_hash);
}
