//! FRED (Federal Reserve Economic Data) rate provider.
//!
//! Fetches a level series from the `series/observations` endpoint. FRED
//! encodes missing observations as `"."`; those become null cells in the
//! raw frame.

use super::circuit_breaker::CircuitBreaker;
use super::http::{build_client, HttpOptions};
use super::provider::{DataProvider, DataSource, FetchResult, ProviderError, RawFrame};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct FredErrorBody {
    error_message: Option<String>,
}

/// FRED data provider.
pub struct FredProvider {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
    circuit_breaker: Arc<CircuitBreaker>,
    opts: HttpOptions,
}

impl FredProvider {
    pub fn new(
        api_key: Option<String>,
        circuit_breaker: Arc<CircuitBreaker>,
        opts: HttpOptions,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(&opts)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            circuit_breaker,
            opts,
        })
    }

    fn parse_response(series_id: &str, resp: ObservationsResponse) -> Result<RawFrame, ProviderError> {
        let mut dates = Vec::with_capacity(resp.observations.len());
        let mut values = Vec::with_capacity(resp.observations.len());

        for obs in resp.observations {
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").map_err(|e| {
                ProviderError::ResponseFormatChanged(format!("bad observation date '{}': {e}", obs.date))
            })?;
            let value = match obs.value.trim() {
                "." | "" => None,
                raw => Some(raw.parse::<f64>().map_err(|e| {
                    ProviderError::ResponseFormatChanged(format!("bad observation value '{raw}': {e}"))
                })?),
            };
            dates.push(date);
            values.push(value);
        }

        if dates.is_empty() {
            return Err(ProviderError::EmptyPayload {
                symbol: series_id.to_string(),
            });
        }

        Ok(RawFrame::new(dates).with_column("value", values))
    }

    fn fetch_with_retry(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawFrame, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::AuthenticationRequired("FRED_API_KEY is not set".into())
        })?;

        if !self.circuit_breaker.is_allowed() {
            return Err(ProviderError::CircuitBreakerTripped);
        }

        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let query = [
            ("series_id", series_id),
            ("api_key", api_key),
            ("file_type", "json"),
            ("observation_start", start.as_str()),
            ("observation_end", end.as_str()),
        ];

        let mut last_error = None;

        for attempt in 0..=self.opts.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.opts.backoff(attempt));
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(ProviderError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(BASE_URL).query(&query).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(ProviderError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(ProviderError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                last_error = Some(ProviderError::RateLimited {
                    retry_after_secs: 60,
                });
                continue;
            }

            if status.is_server_error() {
                self.circuit_breaker.record_failure();
                last_error = Some(ProviderError::Other(format!("HTTP {status} for {series_id}")));
                continue;
            }

            // FRED reports bad keys and unknown series as 400 with a JSON body.
            if status.is_client_error() {
                let message = resp
                    .json::<FredErrorBody>()
                    .ok()
                    .and_then(|b| b.error_message)
                    .unwrap_or_else(|| format!("HTTP {status}"));
                return Err(match status {
                    reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                        ProviderError::AuthenticationRequired(message)
                    }
                    _ if message.contains("series does not exist") => ProviderError::SymbolNotFound {
                        symbol: series_id.to_string(),
                    },
                    _ => ProviderError::Other(message),
                });
            }

            let body: ObservationsResponse = resp.json().map_err(|e| {
                ProviderError::ResponseFormatChanged(format!(
                    "failed to parse observations for {series_id}: {e}"
                ))
            })?;

            let frame = Self::parse_response(series_id, body)?;
            self.circuit_breaker.record_success();
            return Ok(frame);
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for FredProvider {
    fn name(&self) -> &str {
        "fred"
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
            source: DataSource::Fred,
        })
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some() && self.circuit_breaker.is_allowed()
    }

    fn unavailable_reason(&self) -> Option<ProviderError> {
        if self.api_key.is_none() {
            Some(ProviderError::AuthenticationRequired("FRED_API_KEY is not set".into()))
        } else if !self.circuit_breaker.is_allowed() {
            Some(ProviderError::CircuitBreakerTripped)
        } else {
            None
        }
    }
}
