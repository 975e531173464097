//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Discover hooks → Register → init() → configWillLoad → configDidLoad
//!
//! Gated phases (orchestrator.rs + gate.rs):
//!     didLoad tasks → load gate → willReady tasks → boot gate → ready
//!
//! Fan-out (orchestrator.rs):
//!     ready → didReady;  host listener up → serverDidReady
//!
//! Shutdown (teardown.rs, shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → close() → teardown newest-first → close event
//! ```
//!
//! # Design Decisions
//! - Phase order is fixed; each trigger fails if called out of order
//! - One failing gated task resolves its phase with that error, without
//!   cancelling the others
//! - Fan-out and teardown failures go to the `error` event, never to
//!   sibling tasks

pub mod error;
pub mod events;
pub mod gate;
pub mod hooks;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod teardown;

pub use error::{HookError, HookResult, LifecycleError};
pub use events::{EventBus, LifecycleEvent, ListenerId};
pub use gate::{ReadinessGate, ReadyCallback, ReadyOutcome, ReadySignal, StartMode};
pub use hooks::{BootHook, BootHookDef, HookFuture, Participant};
pub use orchestrator::{Lifecycle, LifecycleState};
pub use shutdown::Shutdown;
pub use startup::{load_boot_hooks, BootUnit, HookDiscovery, StaticDiscovery};
pub use teardown::{TeardownId, TeardownRegistry};
