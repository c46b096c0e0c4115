//! Data layer: providers, normalization, snapshot storage, ingestion.

pub mod circuit_breaker;
pub mod fred;
pub mod http;
pub mod ingest;
pub mod normalize;
pub mod provider;
pub mod snapshot;
pub mod update;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use fred::FredProvider;
pub use http::HttpOptions;
pub use ingest::{AssetIngestor, IngestOutcome};
pub use provider::{DataProvider, DataSource, FetchResult, ProviderError, RawColumn, RawFrame};
pub use snapshot::{SeriesMeta, SnapshotKey, SnapshotStore};
pub use update::{update_all_assets, AssetReport, AssetStatus, IngestProgress, LogProgress, UpdateSummary};
pub use yahoo::YahooProvider;
