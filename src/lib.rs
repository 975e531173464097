//! Application bootstrap lifecycle.
//!
//! Drives boot hooks through a fixed sequence of phases, gates the
//! asynchronous phases on readiness, and tears everything down in reverse
//! registration order on close.

pub mod admin;
pub mod app;
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use app::Application;
pub use config::schema::BootConfig;
pub use lifecycle::{BootHook, Lifecycle, LifecycleError, Shutdown};
