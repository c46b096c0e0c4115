//! Snapshot store: dated directories holding one CSV file per asset.
//!
//! Layout: `{base_dir}/{YYYYMMDD}/{asset}.csv` with header `date,{asset}`
//! and ISO-8601 dates in ascending order. Each write also leaves a
//! `{asset}.meta.json` sidecar (row count, date range, content hash).
//!
//! Features:
//! - Fixed-width 8-digit keys, so lexicographic order is chronological order
//! - Atomic writes (write to .tmp, rename into place)
//! - No caching: every call re-reads the directory tree

use super::provider::DataSource;
use crate::domain::{AssetKey, AssetSeries, SeriesPoint};
use crate::error::{CycleError, CycleResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snapshot identifier: exactly eight ASCII digits (`YYYYMMDD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotKey(String);

impl SnapshotKey {
    pub fn for_date(date: NaiveDate) -> Self {
        Self(date.format("%Y%m%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar date named by the key, if it is a real date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y%m%d").ok()
    }
}

impl FromStr for SnapshotKey {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(CycleError::validation(format!(
                "invalid snapshot key '{s}': expected 8 digits (YYYYMMDD)"
            )))
        }
    }
}

impl TryFrom<String> for SnapshotKey {
    type Error = CycleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SnapshotKey> for String {
    fn from(key: SnapshotKey) -> Self {
        key.0
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata sidecar written next to each asset file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub asset: AssetKey,
    pub snapshot: SnapshotKey,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub row_count: usize,
    pub data_hash: String,
    pub source: Option<DataSource>,
    pub written_at: NaiveDateTime,
}

/// Filesystem-backed snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    base_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `{base_dir}/{key}/`
    pub fn snapshot_dir(&self, key: &SnapshotKey) -> PathBuf {
        self.base_dir.join(key.as_str())
    }

    /// `{base_dir}/{key}/{asset}.csv`
    pub fn series_path(&self, key: &SnapshotKey, asset: AssetKey) -> PathBuf {
        self.snapshot_dir(key).join(format!("{asset}.csv"))
    }

    fn meta_path(&self, key: &SnapshotKey, asset: AssetKey) -> PathBuf {
        self.snapshot_dir(key).join(format!("{asset}.meta.json"))
    }

    /// All snapshot keys, ascending.
    ///
    /// A directory counts as a snapshot when its name is a valid key and it
    /// holds at least one `.csv` file. A missing base directory yields an
    /// empty list.
    pub fn list_snapshot_keys(&self) -> CycleResult<Vec<SnapshotKey>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.base_dir).map_err(|e| {
            CycleError::storage(format!("read dir {}: {e}", self.base_dir.display()))
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CycleError::storage(format!("dir entry: {e}")))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Ok(key) = name.parse::<SnapshotKey>() else {
                debug!(dir = %path.display(), "ignoring non-snapshot directory");
                continue;
            };
            if has_csv_file(&path) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// The maximum snapshot key present.
    pub fn latest_snapshot_key(&self) -> CycleResult<SnapshotKey> {
        self.list_snapshot_keys()?
            .pop()
            .ok_or_else(|| {
                CycleError::not_found(format!(
                    "no snapshot directories found in {}",
                    self.base_dir.display()
                ))
            })
    }

    /// Supported assets with a file in the given snapshot, in key order.
    pub fn list_assets(&self, key: &SnapshotKey) -> CycleResult<Vec<AssetKey>> {
        let dir = self.snapshot_dir(key);
        if !dir.is_dir() {
            return Err(CycleError::not_found(format!("snapshot {key} does not exist")));
        }
        Ok(AssetKey::ALL
            .into_iter()
            .filter(|asset| self.series_path(key, *asset).is_file())
            .collect())
    }

    /// Read one asset's series from a snapshot, sorted ascending by date.
    ///
    /// Empty value cells read back as NaN.
    pub fn read_series(&self, key: &SnapshotKey, asset: AssetKey) -> CycleResult<AssetSeries> {
        let path = self.series_path(key, asset);
        if !path.is_file() {
            return Err(CycleError::not_found(format!(
                "{asset}.csv not found in snapshot {key}"
            )));
        }

        let storage_err = |e: csv::Error| CycleError::storage(format!("{}: {e}", path.display()));

        let mut reader = csv::Reader::from_path(&path).map_err(storage_err)?;
        let headers = reader.headers().map_err(storage_err)?.clone();
        let date_idx = column_index(&headers, "date", &path)?;
        let value_idx = column_index(&headers, asset.as_str(), &path)?;

        let mut points = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(storage_err)?;
            let raw_date = record.get(date_idx).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|e| {
                CycleError::storage(format!(
                    "{} row {}: bad date '{raw_date}': {e}",
                    path.display(),
                    row + 1
                ))
            })?;
            let raw_value = record.get(value_idx).unwrap_or("").trim();
            let value = if raw_value.is_empty() {
                f64::NAN
            } else {
                raw_value.parse::<f64>().map_err(|e| {
                    CycleError::storage(format!(
                        "{} row {}: bad value '{raw_value}': {e}",
                        path.display(),
                        row + 1
                    ))
                })?
            };
            points.push(SeriesPoint { date, value });
        }

        points.sort_by_key(|p| p.date);
        debug!(%key, %asset, rows = points.len(), "read series");
        Ok(AssetSeries::new(asset, points))
    }

    /// Write (or overwrite) a series into a snapshot without provenance.
    pub fn write_series(&self, key: &SnapshotKey, series: &AssetSeries) -> CycleResult<SeriesMeta> {
        self.write_series_from(key, series, None)
    }

    /// Write (or overwrite) a series and its metadata sidecar.
    ///
    /// Creates the snapshot directory if absent. Both files are written to
    /// temporary paths first; the sidecar is staged before the CSV is renamed
    /// into place and follows it. Once the CSV is in place the write has
    /// succeeded: a sidecar failure is logged and leaves no sidecar behind.
    pub fn write_series_from(
        &self,
        key: &SnapshotKey,
        series: &AssetSeries,
        source: Option<DataSource>,
    ) -> CycleResult<SeriesMeta> {
        let dir = self.snapshot_dir(key);
        fs::create_dir_all(&dir)
            .map_err(|e| CycleError::storage(format!("create dir {}: {e}", dir.display())))?;

        let asset = series.asset;
        let path = self.series_path(key, asset);
        let tmp_path = path.with_extension("csv.tmp");
        let meta_path = self.meta_path(key, asset);
        let meta_tmp = meta_path.with_extension("json.tmp");

        let meta = SeriesMeta {
            asset,
            snapshot: key.clone(),
            start_date: series.first_date(),
            end_date: series.last_date(),
            row_count: series.len(),
            data_hash: series_hash(series),
            source,
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| CycleError::storage(format!("meta serialization: {e}")))?;

        if let Err(e) = write_csv(&tmp_path, series) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        let staged = match fs::write(&meta_tmp, meta_json) {
            Ok(()) => true,
            Err(e) => {
                warn!(%key, %asset, error = %e, "meta staging failed");
                let _ = fs::remove_file(&meta_tmp);
                false
            }
        };

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            let _ = fs::remove_file(&meta_tmp);
            CycleError::storage(format!("atomic rename failed: {e}"))
        })?;

        let published = staged
            && match fs::rename(&meta_tmp, &meta_path) {
                Ok(()) => true,
                Err(e) => {
                    warn!(%key, %asset, error = %e, "meta rename failed");
                    let _ = fs::remove_file(&meta_tmp);
                    false
                }
            };
        if !published {
            // The previous sidecar describes data that is gone
            let _ = fs::remove_file(&meta_path);
        }

        debug!(%key, %asset, rows = series.len(), "wrote series");
        Ok(meta)
    }

    /// Metadata sidecar for an asset file, if present and readable.
    pub fn read_meta(&self, key: &SnapshotKey, asset: AssetKey) -> Option<SeriesMeta> {
        let content = fs::read_to_string(self.meta_path(key, asset)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

fn has_csv_file(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(Result::ok).any(|e| {
                let p = e.path();
                p.is_file() && p.extension().and_then(|x| x.to_str()) == Some("csv")
            })
        })
        .unwrap_or(false)
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> CycleResult<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| {
            CycleError::storage(format!("{}: missing column '{name}'", path.display()))
        })
}

fn write_csv(path: &Path, series: &AssetSeries) -> CycleResult<()> {
    let storage_err = |e: csv::Error| CycleError::storage(format!("{}: {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(storage_err)?;
    writer
        .write_record(["date", series.asset.as_str()])
        .map_err(storage_err)?;
    for point in &series.points {
        let value = if point.value.is_nan() {
            String::new()
        } else {
            point.value.to_string()
        };
        writer
            .write_record([point.date.format(DATE_FORMAT).to_string(), value])
            .map_err(storage_err)?;
    }
    writer
        .flush()
        .map_err(|e| CycleError::storage(format!("{}: flush: {e}", path.display())))
}

/// BLAKE3 over the asset key and every `(date, value)` pair.
pub fn series_hash(series: &AssetSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(series.asset.as_str().as_bytes());
    for point in &series.points {
        hasher.update(point.date.to_string().as_bytes());
        hasher.update(&point.value.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
