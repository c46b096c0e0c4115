//! Yahoo Finance price provider.
//!
//! Fetches daily OHLCV rows from Yahoo's v8 chart API and hands them to the
//! ingestor as a multi-column raw frame. Handles rate limiting, bounded
//! retries with exponential backoff and the shared circuit breaker.

use super::circuit_breaker::CircuitBreaker;
use super::http::{build_client, HttpOptions};
use super::provider::{DataProvider, DataSource, FetchResult, ProviderError, RawFrame};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    opts: HttpOptions,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, opts: HttpOptions) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(&opts)?,
            circuit_breaker,
            opts,
        })
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(start_ts);
        let encoded = symbol.replace('^', "%5E").replace('=', "%3D");
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{encoded}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    /// Parse the chart API response into a raw OHLCV frame.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<RawFrame, ProviderError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                ProviderError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => ProviderError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("result array is empty".into()))?;

        // A symbol with no trading history in range comes back without timestamps.
        let Some(timestamps) = data.timestamp else {
            return Err(ProviderError::EmptyPayload {
                symbol: symbol.to_string(),
            });
        };

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let cell = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

        let n = timestamps.len();
        let mut dates = Vec::with_capacity(n);
        let (mut open, mut high, mut low, mut close, mut adj, mut volume) = (
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        );

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let row = [
                cell(&quote.open, i),
                cell(&quote.high, i),
                cell(&quote.low, i),
                cell(&quote.close, i),
                cell(&adj_closes, i),
                cell(&quote.volume, i),
            ];

            // Holidays come back as all-null rows
            if row.iter().all(Option::is_none) {
                continue;
            }

            dates.push(date);
            open.push(row[0]);
            high.push(row[1]);
            low.push(row[2]);
            close.push(row[3]);
            adj.push(row[4]);
            volume.push(row[5]);
        }

        if dates.is_empty() {
            return Err(ProviderError::EmptyPayload {
                symbol: symbol.to_string(),
            });
        }

        Ok(RawFrame::new(dates)
            .with_column("open", open)
            .with_column("high", high)
            .with_column("low", low)
            .with_column("close", close)
            .with_column("adj_close", adj)
            .with_column("volume", volume))
    }

    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawFrame, ProviderError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(ProviderError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol, start, end);
        let mut last_error = None;

        for attempt in 0..=self.opts.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.opts.backoff(attempt));
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(ProviderError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(ProviderError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(ProviderError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(ProviderError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(ProviderError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ProviderError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ProviderError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(ProviderError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                ProviderError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            })?;

            let frame = Self::parse_response(symbol, chart)?;
            self.circuit_breaker.record_success();
            return Ok(frame);
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, ProviderError> {
        let frame = self.fetch_with_retry(symbol, start, end)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            frame,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }

    fn unavailable_reason(&self) -> Option<ProviderError> {
        (!self.circuit_breaker.is_allowed()).then_some(ProviderError::CircuitBreakerTripped)
    }
}
