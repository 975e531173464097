//! Readiness gates.
//!
//! # Responsibilities
//! - Track the set of tasks still pending for one phase
//! - Resolve exactly once: when the set empties, on the first task error, or on timeout
//! - Report per-task progress (`ready_stat`) and timeouts (`ready_timeout`) on an [`EventBus`]
//!
//! # Design Decisions
//! - All state mutation happens under one mutex per gate; events and
//!   resolution handlers run after the lock is released
//! - A completion handle is consumed when used, so a task can only be
//!   removed once
//! - Tasks still running when the gate resolves are abandoned, never cancelled

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::events::{EventBus, LifecycleEvent};
use crate::observability::metrics;

/// Final result a gate or signal resolves with.
pub type ReadyOutcome = Result<(), LifecycleError>;

type ReadyHandler = Box<dyn FnOnce(ReadyOutcome) + Send>;

/// A one-shot readiness signal.
///
/// Every subscriber, whether registered before or after the signal fires,
/// observes the same outcome exactly once.
#[derive(Clone)]
pub struct ReadySignal {
    inner: Arc<SignalInner>,
}

struct SignalInner {
    state: Mutex<SignalState>,
    tx: watch::Sender<Option<ReadyOutcome>>,
}

#[derive(Default)]
struct SignalState {
    outcome: Option<ReadyOutcome>,
    handlers: Vec<ReadyHandler>,
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(SignalInner {
                state: Mutex::new(SignalState::default()),
                tx,
            }),
        }
    }

    /// Resolve the signal. Returns false if it had already fired.
    pub fn fire(&self, outcome: ReadyOutcome) -> bool {
        let handlers = {
            let mut state = lock(&self.inner.state);
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            std::mem::take(&mut state.handlers)
        };

        self.inner.tx.send_replace(Some(outcome.clone()));
        for handler in handlers {
            handler(outcome.clone());
        }
        true
    }

    /// Subscribe a one-shot handler. Runs immediately if already resolved.
    pub fn on_ready<F>(&self, handler: F)
    where
        F: FnOnce(ReadyOutcome) + Send + 'static,
    {
        let resolved = {
            let mut state = lock(&self.inner.state);
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.handlers.push(Box::new(handler));
                    return;
                }
            }
        };
        handler(resolved);
    }

    /// Wait until the signal fires.
    pub async fn wait(&self) -> ReadyOutcome {
        let mut rx = self.inner.tx.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Ok(())),
            // The sender lives as long as `self`.
            Err(_) => Ok(()),
        };
        outcome
    }

    pub fn outcome(&self) -> Option<ReadyOutcome> {
        lock(&self.inner.state).outcome.clone()
    }

    pub fn is_ready(&self) -> bool {
        lock(&self.inner.state).outcome.is_some()
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a gate counts completions from construction or waits for [`ReadinessGate::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Started at construction.
    Eager,
    /// Accepts registrations but does not resolve or arm its timeout until started.
    Lazy,
}

/// Barrier that resolves once every registered task for a phase completes.
#[derive(Clone)]
pub struct ReadinessGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    phase: String,
    timeout: Option<Duration>,
    events: EventBus,
    signal: ReadySignal,
    state: Mutex<GateState>,
}

#[derive(Default)]
struct GateState {
    /// Pending task ids in registration order.
    pending: Vec<String>,
    started: bool,
    resolved: bool,
    timer: Option<JoinHandle<()>>,
}

impl ReadinessGate {
    /// Create a gate for `phase`, reporting on `events`.
    pub fn new(
        phase: impl Into<String>,
        timeout: Option<Duration>,
        mode: StartMode,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(GateInner {
                phase: phase.into(),
                timeout,
                events,
                signal: ReadySignal::new(),
                state: Mutex::new(GateState {
                    started: mode == StartMode::Eager,
                    ..GateState::default()
                }),
            }),
        }
    }

    /// Add a pending task and hand back its completion handle.
    ///
    /// Ids colliding with a still-pending task get a `#n` suffix. Once the gate
    /// has resolved, the returned handle is inert.
    pub fn register(&self, id: impl Into<String>) -> ReadyCallback {
        let requested = id.into();
        let mut state = lock(&self.inner.state);

        if state.resolved {
            tracing::debug!(
                phase = %self.inner.phase,
                task = %requested,
                "Gate already resolved, ignoring registration"
            );
            return ReadyCallback {
                gate: None,
                id: requested,
            };
        }

        let mut id = requested.clone();
        let mut n = 2;
        while state.pending.contains(&id) {
            id = format!("{}#{}", requested, n);
            n += 1;
        }

        state.pending.push(id.clone());
        if state.started {
            self.arm_timer(&mut state);
        }

        tracing::debug!(
            phase = %self.inner.phase,
            task = %id,
            pending = state.pending.len(),
            "Ready task registered"
        );

        ReadyCallback {
            gate: Some(self.clone()),
            id,
        }
    }

    /// Begin counting. Resolves immediately if nothing is pending.
    pub fn start(&self) {
        let mut state = lock(&self.inner.state);
        if state.resolved {
            return;
        }
        state.started = true;

        if state.pending.is_empty() {
            self.resolve(state, Ok(()));
        } else {
            self.arm_timer(&mut state);
        }
    }

    /// Resolve with `err` without waiting for pending tasks. No-op once resolved.
    pub fn abort(&self, err: LifecycleError) {
        let state = lock(&self.inner.state);
        if state.resolved {
            return;
        }
        tracing::debug!(phase = %self.inner.phase, error = %err, "Gate aborted");
        self.resolve(state, Err(err));
    }

    /// Subscribe a one-shot handler for the gate's resolution.
    pub fn on_ready<F>(&self, handler: F)
    where
        F: FnOnce(ReadyOutcome) + Send + 'static,
    {
        self.inner.signal.on_ready(handler);
    }

    /// Wait for the gate to resolve.
    pub async fn wait(&self) -> ReadyOutcome {
        self.inner.signal.wait().await
    }

    pub fn phase(&self) -> &str {
        &self.inner.phase
    }

    pub fn pending(&self) -> Vec<String> {
        lock(&self.inner.state).pending.clone()
    }

    pub fn is_started(&self) -> bool {
        lock(&self.inner.state).started
    }

    pub fn is_resolved(&self) -> bool {
        lock(&self.inner.state).resolved
    }

    pub fn outcome(&self) -> Option<ReadyOutcome> {
        self.inner.signal.outcome()
    }

    fn complete(&self, id: &str, error: Option<LifecycleError>) {
        let mut state = lock(&self.inner.state);
        if state.resolved {
            tracing::debug!(
                phase = %self.inner.phase,
                task = %id,
                "Task finished after gate resolved, result discarded"
            );
            return;
        }

        let Some(pos) = state.pending.iter().position(|p| p == id) else {
            return;
        };
        state.pending.remove(pos);

        if let Some(err) = error {
            metrics::record_ready_task(&self.inner.phase, "error");
            self.resolve(state, Err(err));
            return;
        }

        metrics::record_ready_task(&self.inner.phase, "ok");
        let remain = state.pending.clone();
        let finished = remain.is_empty() && state.started;
        let timer = if finished {
            state.resolved = true;
            state.timer.take()
        } else {
            None
        };
        drop(state);

        self.inner.events.emit(&LifecycleEvent::ReadyStat {
            phase: self.inner.phase.clone(),
            id: id.to_string(),
            remain,
        });

        if finished {
            if let Some(timer) = timer {
                timer.abort();
            }
            self.finish(Ok(()));
        }
    }

    fn expire(&self) {
        let mut state = lock(&self.inner.state);
        if state.resolved {
            return;
        }
        state.timer = None;

        let pending = state.pending.clone();
        let timeout_ms = self
            .inner
            .timeout
            .map(|t| t.as_millis() as u64)
            .unwrap_or_default();

        let err = LifecycleError::GateTimeout {
            phase: self.inner.phase.clone(),
            pending: pending.clone(),
            timeout_ms,
        };

        state.resolved = true;
        drop(state);

        self.inner.events.emit(&LifecycleEvent::ReadyTimeout {
            phase: self.inner.phase.clone(),
            pending,
            timeout_ms,
        });
        self.finish(Err(err));
    }

    /// Mark resolved under the lock, then notify with the lock released.
    fn resolve(&self, mut state: MutexGuard<'_, GateState>, outcome: ReadyOutcome) {
        state.resolved = true;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        drop(state);
        self.finish(outcome);
    }

    fn finish(&self, outcome: ReadyOutcome) {
        metrics::record_gate_resolution(
            &self.inner.phase,
            outcome.as_ref().err().map(LifecycleError::kind).unwrap_or("ok"),
        );
        if let Err(err) = &outcome {
            self.inner.events.emit(&LifecycleEvent::Error(err.clone()));
        }
        self.inner.signal.fire(outcome);
    }

    fn arm_timer(&self, state: &mut GateState) {
        let Some(timeout) = self.inner.timeout else {
            return;
        };
        if state.timer.is_some() {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    phase = %self.inner.phase,
                    "No async runtime available, gate timeout not armed"
                );
                return;
            }
        };

        let gate: Weak<GateInner> = Arc::downgrade(&self.inner);
        state.timer = Some(handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = gate.upgrade() {
                ReadinessGate { inner }.expire();
            }
        }));
    }
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("ReadinessGate")
            .field("phase", &self.inner.phase)
            .field("pending", &state.pending)
            .field("started", &state.started)
            .field("resolved", &state.resolved)
            .finish()
    }
}

/// Completion handle for one registered task.
///
/// Consuming the handle removes the task from its gate. Dropping it without
/// calling either method leaves the task pending until the gate times out.
#[must_use = "a pending ready task blocks its gate until completed"]
pub struct ReadyCallback {
    gate: Option<ReadinessGate>,
    id: String,
}

impl ReadyCallback {
    /// The (possibly disambiguated) task id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mark the task as finished successfully.
    pub fn ready(self) {
        self.finish(Ok(()));
    }

    /// Mark the task as failed, resolving the whole gate with `err`.
    pub fn fail(self, err: LifecycleError) {
        self.finish(Err(err));
    }

    pub fn finish(self, outcome: ReadyOutcome) {
        if let Some(gate) = &self.gate {
            gate.complete(&self.id, outcome.err());
        }
    }
}

impl std::fmt::Debug for ReadyCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyCallback")
            .field("id", &self.id)
            .field("inert", &self.gate.is_none())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
