//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional --config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HttpeekConfig (validated, immutable)
//!     → CLI flag overrides (--port, --cacert)
//!     → TransportConfig handed to the Tracer, ApiConfig to the server
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; no file means defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ApiConfig, HttpeekConfig, ObservabilityConfig, TlsConfig, TransportConfig};
