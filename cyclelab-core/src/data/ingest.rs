//! AssetIngestor: fetch one asset, normalize it, write it to today's snapshot.

use super::normalize::{reduce_frame, reindex_daily};
use super::provider::{DataProvider, ProviderError};
use super::snapshot::{SnapshotKey, SnapshotStore};
use crate::domain::{AssetKey, AssetKind, EPOCH};
use crate::error::{CycleError, CycleResult};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to a single asset during ingestion.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Series written to `snapshot` with `rows` daily points.
    Written { snapshot: SnapshotKey, rows: usize },
    /// Provider failed or returned nothing usable; nothing was written.
    Skipped { reason: ProviderError },
}

impl IngestOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, IngestOutcome::Written { .. })
    }
}

/// Fetches raw observations and writes gap-free daily series.
///
/// Market assets are routed to the market provider and rate assets to the
/// rate provider. Every series covers `[EPOCH, today]`, where `today` is
/// fixed per call.
pub struct AssetIngestor {
    store: SnapshotStore,
    market: Arc<dyn DataProvider>,
    rates: Arc<dyn DataProvider>,
}

impl AssetIngestor {
    pub fn new(
        store: SnapshotStore,
        market: Arc<dyn DataProvider>,
        rates: Arc<dyn DataProvider>,
    ) -> Self {
        Self {
            store,
            market,
            rates,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn provider_for(&self, kind: AssetKind) -> &dyn DataProvider {
        match kind {
            AssetKind::Market => self.market.as_ref(),
            AssetKind::Rate => self.rates.as_ref(),
        }
    }

    /// Ingest `asset_key` into the snapshot for the local current date.
    pub fn ingest(&self, asset_key: &str) -> CycleResult<IngestOutcome> {
        self.ingest_as_of(asset_key, chrono::Local::now().date_naive())
    }

    /// Ingest `asset_key` treating `today` as the last covered day.
    ///
    /// An unsupported key fails with `Validation` before any provider or
    /// filesystem access.
    pub fn ingest_as_of(&self, asset_key: &str, today: NaiveDate) -> CycleResult<IngestOutcome> {
        let asset: AssetKey = asset_key.parse()?;
        self.ingest_asset(asset, today)
    }

    pub fn ingest_asset(&self, asset: AssetKey, today: NaiveDate) -> CycleResult<IngestOutcome> {
        if today < EPOCH {
            return Err(CycleError::validation(format!(
                "as-of date {today} precedes epoch {EPOCH}"
            )));
        }

        let provider = self.provider_for(asset.kind());
        let symbol = asset.provider_symbol();
        info!(%asset, symbol, provider = provider.name(), "fetching");

        let fetched = match provider.fetch(symbol, EPOCH, today) {
            Ok(fetched) => fetched,
            Err(reason) => {
                warn!(%asset, symbol, error = %reason, "fetch failed, asset left out of snapshot");
                return Ok(IngestOutcome::Skipped { reason });
            }
        };

        let observations = match reduce_frame(&fetched.frame, asset.kind().value_column(), symbol)
        {
            Ok(obs) => obs,
            Err(reason) => {
                warn!(%asset, symbol, error = %reason, "unusable payload, asset left out of snapshot");
                return Ok(IngestOutcome::Skipped { reason });
            }
        };

        let series = reindex_daily(asset, &observations, EPOCH, today);
        let snapshot = SnapshotKey::for_date(today);
        self.store
            .write_series_from(&snapshot, &series, Some(fetched.source))?;

        info!(
            %asset,
            %snapshot,
            rows = series.len(),
            observations = observations.len(),
            "saved series"
        );
        Ok(IngestOutcome::Written {
            snapshot,
            rows: series.len(),
        })
    }
}
