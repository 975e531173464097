//! Lifecycle error definitions.

use std::sync::Arc;
use thiserror::Error;

use crate::lifecycle::orchestrator::LifecycleState;

/// Error type returned by boot hook callbacks.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single boot hook callback.
pub type HookResult = Result<(), HookError>;

/// Errors produced by the lifecycle orchestrator and its readiness gates.
///
/// Cloneable so every readiness subscriber observes the same value.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// A lifecycle method was called out of order.
    #[error("cannot {operation} while lifecycle is {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// A phase's pending tasks did not complete within budget.
    #[error("{phase} timed out after {timeout_ms}ms, still pending: {pending:?}")]
    GateTimeout {
        phase: String,
        pending: Vec<String>,
        timeout_ms: u64,
    },

    /// A boot hook callback returned an error or panicked.
    #[error("boot task {task} failed: {source}")]
    Participant {
        task: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// One or more teardown callbacks failed during close.
    #[error("{} teardown callback(s) failed", .0.len())]
    Teardown(Vec<LifecycleError>),
}

impl LifecycleError {
    pub(crate) fn participant(task: impl Into<String>, source: HookError) -> Self {
        LifecycleError::Participant {
            task: task.into(),
            source: Arc::from(source),
        }
    }

    pub(crate) fn invalid_state(operation: &'static str, state: LifecycleState) -> Self {
        LifecycleError::InvalidState { operation, state }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::InvalidState { .. } => "invalid_state",
            LifecycleError::GateTimeout { .. } => "timeout",
            LifecycleError::Participant { .. } => "participant",
            LifecycleError::Teardown(_) => "teardown",
        }
    }
}
