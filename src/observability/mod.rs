//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle phases and gated tasks produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!     → timing.rs (named start/end intervals)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//!     → /timings on the status server
//! ```

pub mod logging;
pub mod metrics;
pub mod timing;

pub use timing::{TimingItem, TimingRecorder};
