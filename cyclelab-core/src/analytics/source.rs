//! The seam between the query engines and snapshot storage.

use crate::data::snapshot::{SnapshotKey, SnapshotStore};
use crate::domain::{AssetKey, AssetSeries};
use crate::error::CycleResult;
use chrono::{DateTime, Utc};
use std::fs;
use std::sync::Arc;

/// Where the engines load series from.
///
/// `SnapshotStore` implements this without caching; the service layer wraps
/// it in a memoizing source.
pub trait SeriesSource {
    /// Key of the most recent snapshot.
    fn latest_snapshot_key(&self) -> CycleResult<SnapshotKey>;

    /// One asset's series from the given snapshot.
    fn load_series(&self, key: &SnapshotKey, asset: AssetKey) -> CycleResult<Arc<AssetSeries>>;

    /// Token that changes whenever the stored series is rewritten, if known.
    fn series_version(&self, _key: &SnapshotKey, _asset: AssetKey) -> Option<String> {
        None
    }
}

impl SeriesSource for SnapshotStore {
    fn latest_snapshot_key(&self) -> CycleResult<SnapshotKey> {
        SnapshotStore::latest_snapshot_key(self)
    }

    fn load_series(&self, key: &SnapshotKey, asset: AssetKey) -> CycleResult<Arc<AssetSeries>> {
        self.read_series(key, asset).map(Arc::new)
    }

    /// The sidecar's content hash, or the CSV's modification time when the
    /// sidecar is missing.
    fn series_version(&self, key: &SnapshotKey, asset: AssetKey) -> Option<String> {
        if let Some(meta) = self.read_meta(key, asset) {
            return Some(meta.data_hash);
        }
        let modified = fs::metadata(self.series_path(key, asset)).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified).to_rfc3339())
    }
}
