//! In-memory memo over a `SeriesSource`, scoped to one snapshot key.

use cyclelab_core::analytics::SeriesSource;
use cyclelab_core::data::SnapshotKey;
use cyclelab_core::domain::{AssetKey, AssetSeries};
use cyclelab_core::CycleResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

struct Memoized {
    version: Option<String>,
    series: Arc<AssetSeries>,
}

#[derive(Default)]
struct MemoState {
    key: Option<SnapshotKey>,
    series: HashMap<AssetKey, Memoized>,
}

/// Memoizes loaded series per asset for the current latest snapshot.
///
/// The latest key is always resolved through the inner source, so a new
/// snapshot is picked up on the next query and the memo is cleared when the
/// key changes. Each entry also remembers the inner source's series version,
/// so a series rewritten under the same key is reloaded. Series loaded for
/// any other key pass through uncached.
pub struct MemoizedSource<S> {
    inner: S,
    state: Mutex<MemoState>,
}

impl<S: SeriesSource> MemoizedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Mutex::new(MemoState::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every memoized series.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        let dropped = state.series.len();
        state.key = None;
        state.series.clear();
        debug!(dropped, "memo invalidated");
    }

    /// Number of series currently memoized.
    pub fn cached_len(&self) -> usize {
        self.lock().series.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: SeriesSource> SeriesSource for MemoizedSource<S> {
    fn latest_snapshot_key(&self) -> CycleResult<SnapshotKey> {
        let key = self.inner.latest_snapshot_key()?;
        let mut state = self.lock();
        if state.key.as_ref() != Some(&key) {
            if let Some(old) = state.key.replace(key.clone()) {
                debug!(%old, new = %key, dropped = state.series.len(), "snapshot changed, memo cleared");
            }
            state.series.clear();
        }
        Ok(key)
    }

    fn load_series(&self, key: &SnapshotKey, asset: AssetKey) -> CycleResult<Arc<AssetSeries>> {
        let version = self.inner.series_version(key, asset);
        {
            let state = self.lock();
            if state.key.as_ref() == Some(key) {
                match state.series.get(&asset) {
                    Some(hit) if hit.version == version => return Ok(Arc::clone(&hit.series)),
                    Some(_) => debug!(%key, %asset, "series rewritten, reloading"),
                    None => {}
                }
            }
        }

        let series = self.inner.load_series(key, asset)?;

        let mut state = self.lock();
        if state.key.as_ref() == Some(key) {
            state.series.insert(
                asset,
                Memoized {
                    version,
                    series: Arc::clone(&series),
                },
            );
        }
        Ok(series)
    }

    fn series_version(&self, key: &SnapshotKey, asset: AssetKey) -> Option<String> {
        self.inner.series_version(key, asset)
    }
}
