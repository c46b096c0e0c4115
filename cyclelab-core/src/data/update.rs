//! Batch update orchestrator: ingest every supported asset, never abort.

use super::ingest::{AssetIngestor, IngestOutcome};
use super::provider::ProviderError;
use super::snapshot::SnapshotKey;
use crate::domain::AssetKey;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

/// Per-asset result of a batch update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetStatus {
    Written { rows: usize },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReport {
    pub asset: AssetKey,
    #[serde(flatten)]
    pub status: AssetStatus,
}

impl AssetReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, AssetStatus::Written { .. })
    }
}

/// Summary of a batch update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    pub snapshot: SnapshotKey,
    pub reports: Vec<AssetReport>,
}

impl UpdateSummary {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Progress callback for batch updates.
pub trait IngestProgress {
    fn on_start(&self, asset: AssetKey, index: usize, total: usize);

    fn on_complete(&self, report: &AssetReport, index: usize, total: usize);

    fn on_batch_complete(&self, summary: &UpdateSummary);
}

/// Progress reporter that emits tracing events.
pub struct LogProgress;

impl IngestProgress for LogProgress {
    fn on_start(&self, asset: AssetKey, index: usize, total: usize) {
        info!(%asset, "[{}/{}] updating", index + 1, total);
    }

    fn on_complete(&self, report: &AssetReport, _index: usize, _total: usize) {
        match &report.status {
            AssetStatus::Written { rows } => info!(asset = %report.asset, rows, "ok"),
            AssetStatus::Skipped { reason } => warn!(asset = %report.asset, %reason, "skipped"),
            AssetStatus::Failed { reason } => warn!(asset = %report.asset, %reason, "failed"),
        }
    }

    fn on_batch_complete(&self, summary: &UpdateSummary) {
        info!(
            snapshot = %summary.snapshot,
            "update complete: {}/{} succeeded, {} failed",
            summary.succeeded(),
            summary.total(),
            summary.failed()
        );
    }
}

/// Ingest every supported asset into the snapshot for `today`.
///
/// Failures are recorded per asset and never propagated. When an asset's
/// provider reports itself unavailable the asset is not fetched: an open
/// circuit breaker fails it with `CircuitBreakerTripped`, any other reason
/// (a missing API key) skips it.
pub fn update_all_assets(
    ingestor: &AssetIngestor,
    today: NaiveDate,
    progress: &dyn IngestProgress,
) -> UpdateSummary {
    let total = AssetKey::ALL.len();
    let mut reports = Vec::with_capacity(total);

    for (i, asset) in AssetKey::ALL.into_iter().enumerate() {
        progress.on_start(asset, i, total);

        let provider = ingestor.provider_for(asset.kind());
        let status = match provider.unavailable_reason() {
            Some(reason) => provider_status(reason),
            None => match ingestor.ingest_asset(asset, today) {
                Ok(IngestOutcome::Written { rows, .. }) => AssetStatus::Written { rows },
                Ok(IngestOutcome::Skipped { reason }) => provider_status(reason),
                Err(e) => {
                    warn!(%asset, error = %e, "ingest failed");
                    AssetStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            },
        };

        let report = AssetReport { asset, status };
        progress.on_complete(&report, i, total);
        reports.push(report);
    }

    let summary = UpdateSummary {
        snapshot: SnapshotKey::for_date(today),
        reports,
    };
    progress.on_batch_complete(&summary);
    summary
}

/// A blocked provider is a failure; every other provider error skips the asset.
fn provider_status(reason: ProviderError) -> AssetStatus {
    match reason {
        ProviderError::CircuitBreakerTripped => AssetStatus::Failed {
            reason: reason.to_string(),
        },
        other => AssetStatus::Skipped {
            reason: other.to_string(),
        },
    }
}
