//! Server configuration.
//!
//! Holds the Sourcify endpoint, request timeout, HTTP listen address,
//! transport selection and session limits. Configuration is loaded once from
//! environment variables at startup, with defaults suitable for local use.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Public Sourcify API.
pub const DEFAULT_BASE_URL: &str = "https://sourcify.dev/server";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Transport binding used to serve MCP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST with per-client sessions.
    Http,
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            other => Err(ConfigError::InvalidValue {
                key: "MCP_TRANSPORT".to_string(),
                message: format!("expected 'stdio' or 'http', got '{}'", other),
            }),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Stdio => f.write_str("stdio"),
            TransportMode::Http => f.write_str("http"),
        }
    }
}

/// Configuration for the Sourcify MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcifyConfig {
    /// Sourcify API endpoint.
    pub endpoint: ServiceEndpoint,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,

    /// HTTP transport listen host.
    pub host: String,

    /// HTTP transport listen port.
    pub port: u16,

    /// Transport binding.
    pub transport: TransportMode,

    /// Idle time after which an HTTP session is evicted, in seconds.
    pub session_ttl_secs: u64,

    /// Maximum number of live HTTP sessions.
    pub max_sessions: usize,
}

impl Default for SourcifyConfig {
    fn default() -> Self {
        Self {
            endpoint: ServiceEndpoint {
                base_url: DEFAULT_BASE_URL.to_string(),
            },
            timeout_ms: 30_000,
            host: "localhost".to_string(),
            port: 9003,
            transport: TransportMode::Stdio,
            session_ttl_secs: 30 * 60,
            max_sessions: 1024,
        }
    }
}

impl SourcifyConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SOURCIFY_BASE_URL`: Sourcify API URL (default: https://sourcify.dev/server)
    /// - `API_TIMEOUT`: Request timeout in milliseconds (default: 30000)
    /// - `HOST`: HTTP listen host (default: localhost)
    /// - `PORT`: HTTP listen port (default: 9003)
    /// - `MCP_TRANSPORT`: `stdio` or `http` (default: stdio)
    /// - `SESSION_TTL_SECS`: Idle session lifetime (default: 1800)
    /// - `MAX_SESSIONS`: Session capacity (default: 1024)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let transport = match lookup("MCP_TRANSPORT") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => default.transport,
        };

        Ok(Self {
            endpoint: ServiceEndpoint {
                base_url: lookup("SOURCIFY_BASE_URL")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(default.endpoint.base_url),
            },
            timeout_ms: parse_or(&lookup, "API_TIMEOUT", default.timeout_ms),
            host: lookup("HOST")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default.host),
            port: parse_or(&lookup, "PORT", default.port),
            transport,
            session_ttl_secs: parse_or(&lookup, "SESSION_TTL_SECS", default.session_ttl_secs),
            max_sessions: parse_or(&lookup, "MAX_SESSIONS", default.max_sessions),
        })
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get the session TTL as a Duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// `host:port` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Configuration for a single service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Base URL for the service (e.g., "https://sourcify.dev/server").
    pub base_url: String,
}

impl ServiceEndpoint {
    /// Create an endpoint for a base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SourcifyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.endpoint.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.listen_addr(), "localhost:9003");
        assert_eq!(config.session_ttl(), Duration::from_secs(1800));
        assert_eq!(config.max_sessions, 1024);
    }

    #[test]
    fn test_config_overrides() {
        let config = SourcifyConfig::from_lookup(lookup(&[
            ("SOURCIFY_BASE_URL", "http://localhost:5555"),
            ("API_TIMEOUT", "1500"),
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("MCP_TRANSPORT", "HTTP"),
            ("SESSION_TTL_SECS", "60"),
            ("MAX_SESSIONS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint.base_url, "http://localhost:5555");
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.session_ttl_secs, 60);
        assert_eq!(config.max_sessions, 3);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = SourcifyConfig::from_lookup(lookup(&[
            ("API_TIMEOUT", "soon"),
            ("PORT", "99999"),
        ]))
        .unwrap();
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.port, 9003);
    }

    #[test]
    fn test_unknown_transport_rejected() {
        let err = SourcifyConfig::from_lookup(lookup(&[("MCP_TRANSPORT", "websocket")]))
            .unwrap_err();
        assert!(err.to_string().contains("MCP_TRANSPORT"));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = SourcifyConfig::from_lookup(lookup(&[
            ("SOURCIFY_BASE_URL", " "),
            ("MCP_TRANSPORT", ""),
        ]))
        .unwrap();
        assert_eq!(config.endpoint.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.transport, TransportMode::Stdio);
    }
}
