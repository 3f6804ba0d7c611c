use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::ALPHAVANTAGE_BASE_URL;
use crate::ConfigError;

pub const API_KEY_VAR: &str = "STOCKWATCH_ALPHAVANTAGE_API_KEY";
pub const BASE_URL_VAR: &str = "STOCKWATCH_BASE_URL";
pub const DATA_DIR_VAR: &str = "STOCKWATCH_DATA_DIR";
pub const REFRESH_SECS_VAR: &str = "STOCKWATCH_REFRESH_SECS";
pub const QUOTA_PER_MINUTE_VAR: &str = "STOCKWATCH_QUOTA_PER_MINUTE";

/// Runtime settings for the dashboard core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub api_key: String,
    pub base_url: String,
    pub cache_ttl: Duration,
    pub debounce: Duration,
    pub refresh_interval: Duration,
    pub quota_per_minute: u32,
    pub request_timeout_ms: u64,
    pub data_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_key: String::from("demo"),
            base_url: String::from(ALPHAVANTAGE_BASE_URL),
            cache_ttl: Duration::from_secs(5 * 60),
            debounce: Duration::from_millis(300),
            refresh_interval: Duration::from_secs(5 * 60),
            quota_per_minute: 5,
            request_timeout_ms: 5_000,
            data_dir: PathBuf::from(".stockwatch"),
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by `STOCKWATCH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` yields for each variable name.
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(api_key) = lookup(API_KEY_VAR) {
            config.api_key = api_key;
        }
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(invalid(BASE_URL_VAR, &base_url, "expected an http(s) URL"));
            }
            config.base_url = base_url;
        }
        if let Some(data_dir) = lookup(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(raw) = lookup(REFRESH_SECS_VAR) {
            let secs = parse_positive(REFRESH_SECS_VAR, &raw)?;
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(QUOTA_PER_MINUTE_VAR) {
            let quota = parse_positive(QUOTA_PER_MINUTE_VAR, &raw)?;
            config.quota_per_minute = u32::try_from(quota)
                .map_err(|_| invalid(QUOTA_PER_MINUTE_VAR, &raw, "value is too large"))?;
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(0) => Err(invalid(name, raw, "must be greater than zero")),
        Ok(value) => Ok(value),
        Err(error) => Err(invalid(name, raw, &error.to_string())),
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}
