//! httpeek: HTTP request lifecycle tracing.
//!
//! Issues a request, records DNS, connect, TLS, request-written and
//! first-byte timings, and follows redirects into a nested trace tree.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod report;
pub mod resilience;
pub mod trace;

pub use config::schema::HttpeekConfig;
pub use error::{TraceError, TransportError};
pub use http::ApiServer;
pub use lifecycle::Shutdown;
pub use trace::{trace, RequestTrace, TraceConfig, Tracer};
