//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! trace engine, API server
//!     → logging.rs (tracing subscriber, stderr)
//!     → metrics.rs (counters and histograms, optional Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Default level is `warn` so the console report stays readable
//! - Metrics are disabled unless configured; recording is then free

pub mod logging;
pub mod metrics;
