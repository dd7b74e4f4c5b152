//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum router, tower-http middleware)
//!     → handlers.rs (JSON body → TraceConfig)
//!     → trace::Tracer
//!     → RequestTrace JSON or {"error": ...}
//! ```

pub mod handlers;
pub mod server;

pub use server::{ApiServer, AppState};
