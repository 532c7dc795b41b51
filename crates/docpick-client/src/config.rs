//! Client configuration.
//!
//! Loaded from explicit values or from environment variables:
//! - `DOCPICK_API_BASE`: service base URL including the API prefix
//! - `DOCPICK_SOURCE_TIMEOUT_SECS`: per-source time budget (default: 10)
//! - `DOCPICK_API_KEY`: optional bearer token

use docpick_core::{defaults, Error, Result};
use std::time::Duration;
use tracing::debug;

/// Connection settings for the document services.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://127.0.0.1:8000/api`.
    pub base_url: String,
    /// Time budget for each request in seconds.
    pub timeout_secs: u64,
    /// Bearer token sent as `Authorization` (optional for local services).
    pub api_key: Option<String>,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_BASE_URL.to_string(),
            timeout_secs: defaults::SOURCE_TIMEOUT_SECS,
            api_key: None,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at the given base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var("DOCPICK_API_BASE")
            .unwrap_or_else(|_| defaults::API_BASE_URL.to_string());
        let timeout_secs = std::env::var("DOCPICK_SOURCE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::SOURCE_TIMEOUT_SECS);
        let api_key = std::env::var("DOCPICK_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        debug!(
            base_url = %base_url,
            timeout_secs,
            has_api_key = api_key.is_some(),
            "Loaded client config from environment"
        );

        Self {
            base_url,
            timeout_secs,
            api_key,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Per-request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("base_url cannot be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.timeout_secs, 10);
        assert!(config.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let config = ClientConfig::new("");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let err = ClientConfig::new("ftp://files").validate().unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ClientConfig::default().with_timeout_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let config = ClientConfig::new("http://host/api/");
        assert_eq!(config.endpoint("/documents"), "http://host/api/documents");
        assert_eq!(
            config.endpoint("/documents/uploads/"),
            "http://host/api/documents/uploads/"
        );
        let bare = ClientConfig::new("http://host");
        assert_eq!(bare.endpoint("tags"), "http://host/tags");
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("http://x")
            .with_timeout_secs(3)
            .with_api_key("k");
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }
}
