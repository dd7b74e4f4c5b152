//! Request lifecycle tracing.
//!
//! # Data Flow
//! ```text
//! Tracer::trace(url, config)
//!     → request.rs (validate method/URL, parse header lines)
//!     → recorder.rs TimelineRecorder (fresh per hop)
//!     → net::connector (DNS → TCP → TLS → request → first byte)
//!     → engine.rs (status, headers, optional body)
//!     → 3xx + Location? recurse into redirect_to
//! ```
//!
//! # Design Decisions
//! - One fresh connection per hop, so every hop shows its own phases
//! - The trace tree owns each child hop by value; no cycles are possible
//! - A failed redirect hop truncates the chain instead of failing the trace

pub mod engine;
pub mod model;
pub mod recorder;
pub mod request;

pub use engine::{trace, TraceFuture, Tracer};
pub use model::{EventLabel, HeaderList, RequestTrace, TimelineEvent, TraceConfig};
pub use recorder::{DnsDoneInfo, LifecycleObserver, TimelineRecorder};
