//! Shared blocking HTTP client settings for the providers.

use super::provider::ProviderError;
use std::time::Duration;

/// Transport settings applied to every provider client.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    /// Client-level retries on transient failures (connect, timeout, 429, 5xx).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

impl HttpOptions {
    /// Exponential backoff delay before retry `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

pub(crate) fn build_client(opts: &HttpOptions) -> Result<reqwest::blocking::Client, ProviderError> {
    reqwest::blocking::Client::builder()
        .timeout(opts.timeout)
        .user_agent(opts.user_agent.clone())
        .build()
        .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let opts = HttpOptions {
            base_delay: Duration::from_millis(100),
            ..HttpOptions::default()
        };
        assert_eq!(opts.backoff(1), Duration::from_millis(100));
        assert_eq!(opts.backoff(2), Duration::from_millis(200));
        assert_eq!(opts.backoff(3), Duration::from_millis(400));
    }
}
