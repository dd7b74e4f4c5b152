//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file, and
//! every field has a default so an empty file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HttpeekConfig {
    /// Outbound connection settings used by the trace engine.
    pub transport: TransportConfig,

    /// API server settings (`--api` mode).
    pub api: ApiConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Outbound transport settings. Each value is a fixed ceiling applied to
/// every hop of a redirect chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP dial timeout in seconds.
    pub dial_timeout_secs: u64,

    /// TCP keep-alive interval in seconds.
    pub keep_alive_secs: u64,

    /// TLS handshake timeout in seconds.
    pub tls_handshake_timeout_secs: u64,

    /// Overall deadline for one hop (dial through response body) in seconds.
    pub request_timeout_secs: u64,

    /// Upper bound on captured response body size.
    pub max_body_bytes: usize,

    /// Extra PEM bundle trusted in addition to the bundled web roots.
    pub ca_file: Option<String>,

    /// User-Agent sent when the caller does not supply one.
    pub user_agent: String,
}

impl TransportConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn tls_handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_handshake_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dial_timeout_secs: 10,
            keep_alive_secs: 10,
            tls_handshake_timeout_secs: 10,
            request_timeout_secs: 30,
            max_body_bytes: 16 * 1024 * 1024,
            ca_file: None,
            user_agent: concat!("httpeek/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration for the listener.
    pub tls: Option<TlsConfig>,

    /// Deadline for one API call, including every redirect hop.
    pub request_timeout_secs: u64,

    /// Maximum accepted JSON payload size.
    pub max_request_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            request_timeout_secs: 120,
            max_request_bytes: 1024 * 1024,
        }
    }
}

/// TLS configuration for the API listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: HttpeekConfig = toml::from_str("").unwrap();
        assert_eq!(config.transport.dial_timeout_secs, 10);
        assert_eq!(config.transport.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.api.bind_address, "0.0.0.0:8080");
        assert!(config.api.tls.is_none());
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: HttpeekConfig = toml::from_str(
            r#"
            [transport]
            request_timeout_secs = 5
            ca_file = "/etc/ssl/internal.pem"

            [api.tls]
            cert_path = "cert.pem"
            key_path = "key.pem"
            "#,
        )
        .unwrap();

        assert_eq!(config.transport.request_timeout_secs, 5);
        assert_eq!(config.transport.tls_handshake_timeout_secs, 10);
        assert_eq!(config.transport.ca_file.as_deref(), Some("/etc/ssl/internal.pem"));
        assert_eq!(config.api.tls.unwrap().key_path, "key.pem");
    }
}
