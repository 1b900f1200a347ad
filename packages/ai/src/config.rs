use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;
use trialguard_config::{
    DEFAULT_API_URL, DEFAULT_HTTP_CONNECT_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_MAX_UPLOAD_MB, TRIALGUARD_API_URL, TRIALGUARD_HTTP_CONNECT_TIMEOUT_SECS,
    TRIALGUARD_HTTP_TIMEOUT_SECS, TRIALGUARD_MAX_UPLOAD_MB,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid number in {name}: {source}")]
    InvalidNumber {
        name: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{0} is too large")]
    TooLarge(&'static str),
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Connection settings for the TrialGuard backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub max_upload_bytes: u64,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            request_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var(TRIALGUARD_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(base_url));
        }

        let max_upload_mb = positive_from_env(TRIALGUARD_MAX_UPLOAD_MB, DEFAULT_MAX_UPLOAD_MB)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or(ConfigError::TooLarge(TRIALGUARD_MAX_UPLOAD_MB))?;
        let timeout = positive_from_env(TRIALGUARD_HTTP_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS)?;
        let connect_timeout = positive_from_env(
            TRIALGUARD_HTTP_CONNECT_TIMEOUT_SECS,
            DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
        )?;

        Ok(Self {
            max_upload_bytes,
            request_timeout: Duration::from_secs(timeout),
            connect_timeout: Duration::from_secs(connect_timeout),
            ..Self::new(base_url)
        })
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

fn positive_from_env(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|source| ConfigError::InvalidNumber { name, source })?,
        Err(_) => default,
    };
    if value == 0 {
        return Err(ConfigError::Zero(name));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        env::remove_var(TRIALGUARD_API_URL);
        env::remove_var(TRIALGUARD_MAX_UPLOAD_MB);
        env::remove_var(TRIALGUARD_HTTP_TIMEOUT_SECS);
        env::remove_var(TRIALGUARD_HTTP_CONNECT_TIMEOUT_SECS);
    }

    // Environment is process-global, so the cases run in one test
    #[test]
    fn test_config_from_env() {
        clear_env();
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(600));

        env::set_var(TRIALGUARD_API_URL, "https://api.example.com/");
        env::set_var(TRIALGUARD_MAX_UPLOAD_MB, "25");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.url("/api/history"), "https://api.example.com/api/history");

        env::set_var(TRIALGUARD_MAX_UPLOAD_MB, "lots");
        assert!(matches!(
            ClientConfig::from_env(),
            Err(ConfigError::InvalidNumber { .. })
        ));

        env::set_var(TRIALGUARD_MAX_UPLOAD_MB, "0");
        assert!(matches!(ClientConfig::from_env(), Err(ConfigError::Zero(_))));

        env::set_var(TRIALGUARD_MAX_UPLOAD_MB, u64::MAX.to_string());
        assert!(matches!(ClientConfig::from_env(), Err(ConfigError::TooLarge(_))));

        env::set_var(TRIALGUARD_MAX_UPLOAD_MB, "10");
        env::set_var(TRIALGUARD_API_URL, "localhost:8000");
        assert!(matches!(ClientConfig::from_env(), Err(ConfigError::InvalidUrl(_))));

        clear_env();
    }
}
