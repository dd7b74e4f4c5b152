//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound hop:
//!     → dns.rs (observed getaddrinfo lookup, skipped for IP literals)
//!     → connector.rs (TCP dial, optional TLS handshake)
//!     → stream.rs (request-written / first-byte detection)
//!     → hyper HTTP/1.1 client connection
//!
//! API listener:
//!     → tls.rs (optional rustls server config)
//! ```
//!
//! # Design Decisions
//! - No connection pooling: every hop dials its own connection
//! - Trust roots are loaded once per tracer and shared by all hops

pub mod connector;
pub mod dns;
pub mod stream;
pub mod tls;
