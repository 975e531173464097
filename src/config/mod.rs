//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or defaults
//!     → loader.rs (parse & deserialize, apply READY_TIMEOUT_ENV)
//!     → validation.rs (semantic checks)
//!     → BootConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - A malformed timeout override is fatal at startup
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_default, ConfigError, READY_TIMEOUT_ENV};
pub use schema::{BootConfig, LifecycleConfig, LogFormat, ObservabilityConfig, ServerConfig};
pub use validation::ValidationError;
