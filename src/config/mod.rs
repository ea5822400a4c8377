use std::net::IpAddr;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the inference backend. Unset means mock-only mode.
    #[serde(default)]
    pub upstream_base_url: Option<String>,

    /// Forward to the backend even when it lives on a loopback address.
    #[serde(default)]
    pub allow_loopback_upstream: bool,

    /// Fall back to mock generation when the backend cannot be reached.
    #[serde(default = "default_true")]
    pub mock_fallback: bool,

    /// Artificial latency of the mock path, in milliseconds.
    #[serde(default = "default_mock_delay_ms")]
    pub mock_delay_ms: u64,

    /// Whole-request timeout for the upstream call, in seconds.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_mock_delay_ms() -> u64 {
    3000
}

fn default_upstream_timeout_secs() -> u64 {
    300
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Build the gateway configuration handed to `PredictionGateway`.
    pub fn gateway(&self) -> Result<GatewayConfig, ConfigError> {
        let mut config = GatewayConfig::new(self.upstream_base_url.as_deref())?;
        config.allow_loopback_upstream = self.allow_loopback_upstream;
        config.mock_fallback = self.mock_fallback;
        config.mock_delay = Duration::from_millis(self.mock_delay_ms);
        config.upstream_timeout = Duration::from_secs(self.upstream_timeout_secs);
        Ok(config)
    }
}

/// Explicit gateway configuration, fixed at construction time.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    upstream_base_url: Option<Url>,
    pub allow_loopback_upstream: bool,
    pub mock_fallback: bool,
    pub mock_delay: Duration,
    pub upstream_timeout: Duration,
}

impl GatewayConfig {
    /// A blank or missing base URL yields a mock-only configuration.
    pub fn new(upstream_base_url: Option<&str>) -> Result<Self, ConfigError> {
        let upstream_base_url = match upstream_base_url.map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_base_url(raw)?),
            _ => None,
        };

        Ok(Self {
            upstream_base_url,
            allow_loopback_upstream: false,
            mock_fallback: true,
            mock_delay: Duration::from_millis(default_mock_delay_ms()),
            upstream_timeout: Duration::from_secs(default_upstream_timeout_secs()),
        })
    }

    pub fn mock_only() -> Self {
        Self {
            upstream_base_url: None,
            allow_loopback_upstream: false,
            mock_fallback: true,
            mock_delay: Duration::from_millis(default_mock_delay_ms()),
            upstream_timeout: Duration::from_secs(default_upstream_timeout_secs()),
        }
    }

    pub fn upstream_base_url(&self) -> Option<&Url> {
        self.upstream_base_url.as_ref()
    }

    /// True when the configured upstream points at this machine.
    pub fn is_local_loopback(&self) -> bool {
        let Some(host) = self.upstream_base_url.as_ref().and_then(|url| url.host_str()) else {
            return false;
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        match host.parse::<IpAddr>() {
            Ok(ip) => ip.is_loopback(),
            Err(_) => {
                let host = host.to_ascii_lowercase();
                host == "localhost" || host.ends_with(".localhost")
            }
        }
    }

    /// The upstream requests are actually forwarded to, if any.
    pub fn effective_upstream(&self) -> Option<&Url> {
        if self.is_local_loopback() && !self.allow_loopback_upstream {
            return None;
        }
        self.upstream_base_url.as_ref()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUpstreamUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidUpstreamUrl {
            url: raw.to_string(),
            reason: "expected an absolute http(s) URL".to_string(),
        });
    }

    Ok(url)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid upstream base URL {url:?}: {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_upstream_is_mock_only() {
        let config = GatewayConfig::new(None).unwrap();
        assert!(config.upstream_base_url().is_none());
        assert!(config.effective_upstream().is_none());
        assert!(!config.is_local_loopback());

        let blank = GatewayConfig::new(Some("  ")).unwrap();
        assert!(blank.effective_upstream().is_none());
    }

    #[test]
    fn test_loopback_detection() {
        for url in [
            "http://localhost:8000",
            "http://LOCALHOST:8000",
            "http://api.localhost",
            "http://127.0.0.1:8000",
            "http://127.8.0.1",
            "http://[::1]:8000",
        ] {
            let config = GatewayConfig::new(Some(url)).unwrap();
            assert!(config.is_local_loopback(), "{url} should be loopback");
            assert!(config.effective_upstream().is_none());
        }

        let remote = GatewayConfig::new(Some("https://inference.example.com")).unwrap();
        assert!(!remote.is_local_loopback());
        assert!(remote.effective_upstream().is_some());
    }

    #[test]
    fn test_loopback_allowed_explicitly() {
        let mut config = GatewayConfig::new(Some("http://127.0.0.1:9000")).unwrap();
        config.allow_loopback_upstream = true;
        assert!(config.is_local_loopback());
        assert_eq!(
            config.effective_upstream().map(|u| u.as_str()),
            Some("http://127.0.0.1:9000/")
        );
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(GatewayConfig::new(Some("not a url")).is_err());
        assert!(GatewayConfig::new(Some("ftp://backend")).is_err());
    }
}
