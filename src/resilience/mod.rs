//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! One hop:
//!     → timeouts.rs Deadline (overall request ceiling)
//!         → connector dial timeout (hyper-util HttpConnector)
//!         → timeouts.rs with_timeout (TLS handshake ceiling)
//!         → request write / response head
//!     → Deadline::remaining bounds the body drain
//! ```
//!
//! # Design Decisions
//! - Every network phase has a deadline; a hop never hangs
//! - No retries: a failed hop is reported as-is

pub mod timeouts;
