//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over upstream sources (Yahoo Finance for
//! market prices, FRED for rate levels) so the ingestor can route by asset
//! kind and tests can substitute stubs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upstream failure kinds, reported per asset during a batch update.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("empty payload for {symbol}")]
    EmptyPayload { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("provider error: {0}")]
    Other(String),
}

/// One named column of a raw provider frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Multi-column response as delivered by a provider, before reduction.
///
/// Every column has the same length as `dates`. Dates are in provider
/// order and may contain gaps (weekends, holidays, monthly rate prints).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<RawColumn>,
}

impl RawFrame {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: Vec::new(),
        }
    }

    /// Builder-style column append.
    pub fn with_column(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.columns.push(RawColumn {
            name: name.to_string(),
            values,
        });
        self
    }

    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub frame: RawFrame,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Fred,
    Fixture,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::Fred => "fred",
            DataSource::Fixture => "fixture",
        }
    }
}

/// Trait for upstream data providers.
///
/// Implementations own their transport, timeouts and any client-level
/// retry. The ingestor calls `fetch` exactly once per asset per run.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch raw observations for a symbol over `[start, end]`.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, ProviderError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;

    /// The error a fetch would fail with right now, if the provider is unavailable.
    fn unavailable_reason(&self) -> Option<ProviderError> {
        (!self.is_available())
            .then(|| ProviderError::Other(format!("provider {} unavailable", self.name())))
    }
}
