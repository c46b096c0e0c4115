//! AssetService: the query surface handed to the API layer.
//!
//! Owns the snapshot store, the memoized series source the engines read
//! through, and the ingestor used by batch updates.

use crate::config::ServiceConfig;
use crate::memo::MemoizedSource;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use cyclelab_core::analytics::{CorrelationEngine, CorrelationPoint, ResampleEngine, ResampledTable};
use cyclelab_core::data::{
    update_all_assets, AssetIngestor, CircuitBreaker, DataProvider, FredProvider, IngestProgress,
    SnapshotKey, SnapshotStore, UpdateSummary, YahooProvider,
};
use cyclelab_core::domain::AssetKey;
use cyclelab_core::CycleResult;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

pub struct AssetService {
    source: MemoizedSource<SnapshotStore>,
    ingestor: AssetIngestor,
}

impl AssetService {
    /// Build the service with the Yahoo Finance and FRED providers.
    ///
    /// Both providers share one circuit breaker.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        let opts = config.http_options();

        let market = YahooProvider::new(Arc::clone(&breaker), opts.clone())
            .context("build Yahoo Finance provider")?;
        let rates = FredProvider::new(config.fred_api_key.clone(), breaker, opts)
            .context("build FRED provider")?;

        debug!(data_dir = %config.data_dir.display(), fred_key = config.fred_api_key.is_some(), "asset service ready");
        Ok(Self::with_providers(config.store(), Arc::new(market), Arc::new(rates)))
    }

    /// Build the service around explicit providers.
    pub fn with_providers(
        store: SnapshotStore,
        market: Arc<dyn DataProvider>,
        rates: Arc<dyn DataProvider>,
    ) -> Self {
        Self {
            source: MemoizedSource::new(store.clone()),
            ingestor: AssetIngestor::new(store, market, rates),
        }
    }

    /// Supported asset keys in batch update order.
    pub fn supported_assets() -> Vec<&'static str> {
        AssetKey::ALL.iter().map(|a| a.as_str()).collect()
    }

    pub fn store(&self) -> &SnapshotStore {
        self.source.inner()
    }

    pub fn snapshots(&self) -> CycleResult<Vec<SnapshotKey>> {
        self.store().list_snapshot_keys()
    }

    /// Table rows as JSON records: `{"date": "YYYY-MM-DD", "<asset>": number | null}`.
    pub fn get_table<S: AsRef<str>>(
        &self,
        asset_keys: &[S],
        resolution: &str,
    ) -> CycleResult<Vec<Map<String, Value>>> {
        Ok(self.table(asset_keys, resolution)?.to_records())
    }

    /// Same query as `get_table`, keeping the typed table.
    pub fn table<S: AsRef<str>>(&self, asset_keys: &[S], resolution: &str) -> CycleResult<ResampledTable> {
        ResampleEngine::new(&self.source).get_table(asset_keys, resolution)
    }

    pub fn get_sliding_correlation(
        &self,
        asset1: &str,
        asset2: &str,
        period: &str,
    ) -> CycleResult<Vec<CorrelationPoint>> {
        CorrelationEngine::new(&self.source).get_sliding_correlation(asset1, asset2, period)
    }

    pub fn get_sliding_correlation_as_of(
        &self,
        asset1: &str,
        asset2: &str,
        period: &str,
        as_of: NaiveDate,
    ) -> CycleResult<Vec<CorrelationPoint>> {
        CorrelationEngine::new(&self.source).get_sliding_correlation_as_of(asset1, asset2, period, as_of)
    }

    /// Refresh every asset into today's snapshot.
    pub fn update_all_assets(&self, progress: &dyn IngestProgress) -> UpdateSummary {
        self.update_all_assets_as_of(chrono::Local::now().date_naive(), progress)
    }

    /// Refresh every asset into the snapshot for `today`, then drop the memo.
    pub fn update_all_assets_as_of(&self, today: NaiveDate, progress: &dyn IngestProgress) -> UpdateSummary {
        let summary = update_all_assets(&self.ingestor, today, progress);
        self.source.invalidate();
        summary
    }

    pub fn invalidate(&self) {
        self.source.invalidate();
    }
}
