//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read, parse, STRATA_ENV override)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → App::from_config (defaults, middleware stack, listener limits)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, AppSection, ListenerConfig, LogFormat, MiddlewareConfig, ObservabilityConfig};
pub use validation::{validate_config, ValidationError};
