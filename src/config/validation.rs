//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! Every problem is reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::HttpeekConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &HttpeekConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let transport = &config.transport;

    for (field, value) in [
        ("transport.dial_timeout_secs", transport.dial_timeout_secs),
        ("transport.keep_alive_secs", transport.keep_alive_secs),
        ("transport.tls_handshake_timeout_secs", transport.tls_handshake_timeout_secs),
        ("transport.request_timeout_secs", transport.request_timeout_secs),
        ("api.request_timeout_secs", config.api.request_timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if transport.max_body_bytes == 0 {
        errors.push(ValidationError::new("transport.max_body_bytes", "must be greater than zero"));
    }
    if config.api.max_request_bytes == 0 {
        errors.push(ValidationError::new("api.max_request_bytes", "must be greater than zero"));
    }
    if matches!(transport.ca_file.as_deref(), Some(path) if path.trim().is_empty()) {
        errors.push(ValidationError::new("transport.ca_file", "must not be empty when set"));
    }

    if config.api.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "api.bind_address",
            format!("'{}' is not a socket address", config.api.bind_address),
        ));
    }
    if let Some(tls) = &config.api.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::new("api.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::new("api.tls.key_path", "must not be empty"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&HttpeekConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = HttpeekConfig::default();
        config.transport.dial_timeout_secs = 0;
        config.transport.request_timeout_secs = 0;
        config.api.bind_address = "localhost".into();
        config.api.tls = Some(TlsConfig {
            cert_path: "cert.pem".into(),
            key_path: " ".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "transport.dial_timeout_secs",
                "transport.request_timeout_secs",
                "api.bind_address",
                "api.tls.key_path",
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = HttpeekConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
