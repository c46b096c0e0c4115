//! Service configuration: optional TOML file plus environment overrides.
//!
//! Resolution order, later wins:
//! 1. Built-in defaults
//! 2. `cyclelab.toml` (or an explicit path)
//! 3. `CYCLELAB_DATA_DIR`, `FRED_API_KEY`, `CYCLELAB_HTTP_TIMEOUT_SECS`,
//!    `CYCLELAB_MAX_RETRIES`

use anyhow::{Context, Result};
use cyclelab_core::data::{HttpOptions, SnapshotStore};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "cyclelab.toml";

pub const ENV_DATA_DIR: &str = "CYCLELAB_DATA_DIR";
pub const ENV_FRED_API_KEY: &str = "FRED_API_KEY";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "CYCLELAB_HTTP_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "CYCLELAB_MAX_RETRIES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Base directory holding the dated snapshot directories.
    pub data_dir: PathBuf,
    /// FRED API key. Without one, rate assets are skipped during updates.
    pub fred_api_key: Option<String>,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            fred_api_key: None,
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        let opts = HttpOptions::default();
        Self {
            timeout_secs: opts.timeout.as_secs(),
            max_retries: opts.max_retries,
            base_delay_ms: opts.base_delay.as_millis() as u64,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse service config TOML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load from `path` (or `cyclelab.toml` if present) and apply the
    /// process environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(dir) = var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = var(ENV_FRED_API_KEY) {
            self.fred_api_key = Some(key);
        }
        if let Some(raw) = var(ENV_HTTP_TIMEOUT_SECS) {
            self.http.timeout_secs = raw
                .parse()
                .with_context(|| format!("{ENV_HTTP_TIMEOUT_SECS}={raw} is not a whole number of seconds"))?;
        }
        if let Some(raw) = var(ENV_MAX_RETRIES) {
            self.http.max_retries = raw
                .parse()
                .with_context(|| format!("{ENV_MAX_RETRIES}={raw} is not a non-negative integer"))?;
        }
        Ok(())
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.http.timeout_secs),
            max_retries: self.http.max_retries,
            base_delay: Duration::from_millis(self.http.base_delay_ms),
            ..HttpOptions::default()
        }
    }

    pub fn store(&self) -> SnapshotStore {
        SnapshotStore::new(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let c = ServiceConfig::default();
        assert_eq!(c.data_dir, PathBuf::from("data"));
        assert!(c.fred_api_key.is_none());
        assert_eq!(c.http.timeout_secs, 30);
        assert_eq!(c.http.max_retries, 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServiceConfig::from_toml(
            r#"
            data_dir = "/srv/cyclelab"

            [http]
            max_retries = 5
            "#,
        )
        .unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/srv/cyclelab"));
        assert_eq!(c.http.max_retries, 5);
        assert_eq!(c.http.timeout_secs, 30);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ServiceConfig::from_toml("epoch = \"2000-01-01\"").is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut c = ServiceConfig::from_toml("data_dir = \"from_file\"").unwrap();
        c.apply_overrides(lookup(&[
            (ENV_DATA_DIR, "from_env"),
            (ENV_FRED_API_KEY, " abc123 "),
            (ENV_HTTP_TIMEOUT_SECS, "10"),
        ]))
        .unwrap();

        assert_eq!(c.data_dir, PathBuf::from("from_env"));
        assert_eq!(c.fred_api_key.as_deref(), Some("abc123"));
        assert_eq!(c.http_options().timeout, Duration::from_secs(10));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut c = ServiceConfig::default();
        c.apply_overrides(lookup(&[(ENV_DATA_DIR, "  "), (ENV_FRED_API_KEY, "")]))
            .unwrap();
        assert_eq!(c, ServiceConfig::default());
    }

    #[test]
    fn malformed_numeric_env_is_an_error() {
        let mut c = ServiceConfig::default();
        let err = c
            .apply_overrides(lookup(&[(ENV_MAX_RETRIES, "lots")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains(ENV_MAX_RETRIES));
    }
}
