//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env + config file (TOML)
//!     → loader.rs (parse, deserialize, apply environment overrides)
//!     → validation.rs (semantic checks, wildcard origin rejected)
//!     → ServerConfig (validated, immutable)
//!     → handed to the pipeline and the server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError, ConfigWarning};
pub use schema::{CorsConfig, ListenerConfig, ObservabilityConfig, ServerConfig, ShutdownConfig};
pub use validation::{validate_config, ValidationError};
