//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → listeners stop accepting → in-flight traces finish → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
