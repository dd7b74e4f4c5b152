//! Error types surfaced by the trace engine.
//!
//! Only construction and transport failures reach the caller. Failures while
//! draining a response body or following a redirect are absorbed by the
//! engine and logged.

use std::time::Duration;

use thiserror::Error;

/// Boxed error used where the underlying transport hides its concrete type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`crate::Tracer::trace`].
#[derive(Debug, Error)]
pub enum TraceError {
    /// Malformed method, URL or header. No network activity took place.
    #[error("invalid request: {0}")]
    RequestConstruction(String),

    /// The exchange could not be completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The tracer itself could not be configured (TLS roots, CA bundle).
    #[error("tracer setup failed: {0}")]
    Setup(String),
}

impl TraceError {
    /// Short machine-friendly kind, used for metric labels and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            TraceError::RequestConstruction(_) => "request_construction",
            TraceError::Transport(TransportError::Connect { .. }) => "connect",
            TraceError::Transport(TransportError::Tls { .. }) => "tls",
            TraceError::Transport(TransportError::Timeout { .. }) => "timeout",
            TraceError::Transport(TransportError::Http(_)) => "http",
            TraceError::Setup(_) => "setup",
        }
    }
}

/// Transport-level failures: DNS, dial, TLS, timeouts and HTTP framing.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS resolution or TCP dial failed (including dial timeout).
    #[error("connect to {authority} failed: {}", describe_boxed(.cause))]
    Connect { authority: String, cause: BoxError },

    /// TLS handshake failed, usually certificate verification.
    #[error("tls handshake with {server_name} failed: {source}")]
    Tls {
        server_name: String,
        #[source]
        source: std::io::Error,
    },

    /// A phase deadline elapsed.
    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: &'static str, after: Duration },

    /// HTTP/1.1 protocol error while writing the request or reading the head.
    #[error("http exchange failed: {0}")]
    Http(#[from] hyper::Error),
}

fn describe_boxed(err: &BoxError) -> String {
    describe(&**err)
}

/// Render an error with its full source chain, `outer: inner: root`.
pub(crate) fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut next = err.source();
    while let Some(cause) = next {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        next = cause.source();
    }
    out
}
