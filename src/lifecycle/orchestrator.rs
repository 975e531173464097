//! Phase orchestration.
//!
//! # Data Flow
//! ```text
//! init()                      instantiate hooks, register beforeClose callbacks
//! trigger_config_will_load()  sync, participant order
//!   → trigger_config_did_load()   sync, participant order
//!   → trigger_did_load()          async tasks on the load gate
//! load gate resolves
//!   → trigger_will_ready()        start boot gate, async tasks on it
//! boot gate resolves
//!   → ready fires                 trigger_did_ready() fan-out
//! host listener up
//!   → trigger_server_did_ready()  fan-out
//! close()                      drain teardown, emit close, drop listeners
//! ```
//!
//! Gated phases and fan-outs spawn onto the current Tokio runtime. Without
//! one, gated tasks fail their gate and fan-outs are skipped.
//!
//! The load gate starts counting in `trigger_did_load()`, once every didLoad
//! task is registered, so time the host spends before `init()` does not
//! count against the readiness timeout.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::{JoinHandle, JoinSet};

use crate::app::Application;
use crate::config::schema::LifecycleConfig;
use crate::lifecycle::error::{HookError, HookResult, LifecycleError};
use crate::lifecycle::events::{EventBus, LifecycleEvent};
use crate::lifecycle::gate::{ReadinessGate, ReadyCallback, ReadyOutcome, ReadySignal, StartMode};
use crate::lifecycle::hooks::{BootHook, BootHookDef, HookFuture, HookRegistry, Participant};
use crate::lifecycle::teardown::TeardownRegistry;
use crate::observability::metrics;

const APPLICATION_START: &str = "Application Start";
const LOAD_GATE: &str = "load";
const BOOT_GATE: &str = "boot";

/// Coarse lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    LoadPending,
    BootPending,
    Ready,
    Closing,
    Closed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Initialized => "initialized",
            LifecycleState::LoadPending => "load-pending",
            LifecycleState::BootPending => "boot-pending",
            LifecycleState::Ready => "ready",
            LifecycleState::Closing => "closing",
            LifecycleState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The four chained boot phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BootPhase {
    ConfigWillLoad,
    ConfigDidLoad,
    DidLoad,
    WillReady,
}

/// Drives participants through the boot phases and tears them down on close.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

struct Inner {
    app: Arc<Application>,
    ready_timeout: Duration,
    events: EventBus,
    state: Mutex<LifecycleState>,
    progress: Mutex<Option<BootPhase>>,
    hooks: Mutex<HookRegistry>,
    participants: Mutex<Vec<Participant>>,
    load_gate: ReadinessGate,
    boot_gate: ReadinessGate,
    load_error: Mutex<Option<LifecycleError>>,
    ready: ReadySignal,
    teardown: TeardownRegistry,
    did_ready_triggered: AtomicBool,
    server_did_ready_triggered: AtomicBool,
}

/// A gated task registered but not yet spawned.
struct PreparedTask {
    name: String,
    timing_key: String,
    done: ReadyCallback,
    future: HookFuture,
}

impl Lifecycle {
    pub fn new(app: Arc<Application>, config: &LifecycleConfig) -> Self {
        let events = EventBus::new();
        let ready_timeout = Duration::from_millis(config.ready_timeout_ms);

        app.timing().start(APPLICATION_START);

        let load_gate = ReadinessGate::new(
            LOAD_GATE,
            Some(ready_timeout),
            StartMode::Lazy,
            events.clone(),
        );
        let boot_gate = ReadinessGate::new(
            BOOT_GATE,
            Some(ready_timeout),
            StartMode::Lazy,
            events.clone(),
        );

        let inner = Arc::new(Inner {
            app,
            ready_timeout,
            events,
            state: Mutex::new(LifecycleState::Created),
            progress: Mutex::new(None),
            hooks: Mutex::new(HookRegistry::new()),
            participants: Mutex::new(Vec::new()),
            load_gate,
            boot_gate,
            load_error: Mutex::new(None),
            ready: ReadySignal::new(),
            teardown: TeardownRegistry::new(),
            did_ready_triggered: AtomicBool::new(false),
            server_did_ready_triggered: AtomicBool::new(false),
        });

        let lifecycle = Self { inner };
        lifecycle.log_events();
        lifecycle.chain_gates();
        lifecycle
    }

    pub fn app(&self) -> &Arc<Application> {
        &self.inner.app
    }

    /// Lifecycle events: `ready_stat`, `ready_timeout`, `error`.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.inner.state)
    }

    pub fn ready_timeout(&self) -> Duration {
        self.inner.ready_timeout
    }

    pub fn load_gate(&self) -> &ReadinessGate {
        &self.inner.load_gate
    }

    pub fn boot_gate(&self) -> &ReadinessGate {
        &self.inner.boot_gate
    }

    pub fn teardown_len(&self) -> usize {
        self.inner.teardown.len()
    }

    // --- Registration ---

    /// Add a multi-phase hook built from `factory` at [`init`](Self::init).
    pub fn add_boot_hook<F, H>(
        &self,
        full_path: impl Into<String>,
        factory: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce(Arc<Application>) -> H + Send + 'static,
        H: BootHook,
    {
        self.add_hook(BootHookDef::typed(full_path, factory))
    }

    /// Add a plain function run once during `configDidLoad`.
    pub fn add_function_hook<F>(
        &self,
        full_path: impl Into<String>,
        boot: F,
    ) -> Result<(), LifecycleError>
    where
        F: Fn(&Arc<Application>) -> HookResult + Send + Sync + 'static,
    {
        self.add_hook(BootHookDef::function(full_path, boot))
    }

    /// Add a discovered hook definition of either style.
    pub fn add_hook(&self, def: BootHookDef) -> Result<(), LifecycleError> {
        let state = self.state();
        if state != LifecycleState::Created {
            return Err(LifecycleError::invalid_state("add boot hook", state));
        }
        lock(&self.inner.hooks).add(def)
    }

    /// Register an async task the load phase must wait for.
    pub fn register_before_start<F, Fut>(
        &self,
        label: impl Into<String>,
        task: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let state = self.state();
        if matches!(state, LifecycleState::Closing | LifecycleState::Closed)
            || self.inner.load_gate.is_resolved()
        {
            return Err(LifecycleError::invalid_state("register before start", state));
        }

        let future = async move { task().await }.boxed();
        let prepared = self.prepare(&self.inner.load_gate, "Before Start", label.into(), future);
        self.spawn(prepared);
        Ok(())
    }

    /// Register a callback run during [`close`](Self::close), newest first.
    pub fn register_before_close<F, Fut>(
        &self,
        label: impl Into<String>,
        callback: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let state = self.state();
        if matches!(state, LifecycleState::Closing | LifecycleState::Closed) {
            return Err(LifecycleError::invalid_state("register before close", state));
        }
        self.inner.teardown.register(label, callback);
        Ok(())
    }

    /// Hand out a raw completion handle on the load gate.
    pub fn ready_callback(&self, name: impl Into<String>) -> ReadyCallback {
        self.inner.load_gate.register(name)
    }

    // --- Readiness ---

    /// Subscribe a one-shot handler for overall readiness.
    pub fn on_ready<F>(&self, handler: F)
    where
        F: FnOnce(ReadyOutcome) + Send + 'static,
    {
        self.inner.ready.on_ready(handler);
    }

    /// Wait until both gates have resolved.
    pub async fn ready(&self) -> ReadyOutcome {
        self.inner.ready.wait().await
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.is_ready()
    }

    /// Overall readiness result, once known.
    pub fn outcome(&self) -> Option<ReadyOutcome> {
        self.inner.ready.outcome()
    }

    // --- Control ---

    /// Instantiate hooks in registration order and register their
    /// `beforeClose` callbacks.
    pub fn init(&self) -> Result<(), LifecycleError> {
        {
            let mut state = lock(&self.inner.state);
            if *state != LifecycleState::Created {
                return Err(LifecycleError::invalid_state("init", *state));
            }
            *state = LifecycleState::Initialized;
        }

        let participants = lock(&self.inner.hooks).instantiate_all(&self.inner.app)?;

        for participant in &participants {
            let hook = participant.hook.clone();
            if let Some(future) = capability(move || hook.before_close()) {
                let label = format!("{}:beforeClose", participant.full_path);
                self.inner.teardown.register(label, move || future);
            }
        }

        tracing::debug!(hooks = participants.len(), "Lifecycle initialized");
        *lock(&self.inner.participants) = participants;
        Ok(())
    }

    pub fn trigger_config_will_load(&self) -> Result<(), LifecycleError> {
        {
            let state = self.state();
            if state != LifecycleState::Initialized {
                return Err(LifecycleError::invalid_state("trigger configWillLoad", state));
            }
        }
        self.advance(BootPhase::ConfigWillLoad, "trigger configWillLoad")?;

        for p in self.participants() {
            if let Err(e) = call_sync(|| p.hook.config_will_load()) {
                return Err(self.abort_boot(format!("{}:configWillLoad", p.full_path), e));
            }
        }
        self.trigger_config_did_load()
    }

    pub fn trigger_config_did_load(&self) -> Result<(), LifecycleError> {
        self.advance(BootPhase::ConfigDidLoad, "trigger configDidLoad")?;

        for p in self.participants() {
            if let Err(e) = call_sync(|| p.hook.config_did_load()) {
                return Err(self.abort_boot(format!("{}:configDidLoad", p.full_path), e));
            }
        }
        self.trigger_did_load()
    }

    pub fn trigger_did_load(&self) -> Result<(), LifecycleError> {
        self.advance(BootPhase::DidLoad, "trigger didLoad")?;
        self.set_state(LifecycleState::LoadPending);
        tracing::debug!("Registering didLoad tasks");

        let tasks: Vec<PreparedTask> = self
            .participants()
            .into_iter()
            .filter_map(|p| {
                let hook = p.hook.clone();
                let future = capability(move || hook.did_load())?;
                Some(self.prepare(
                    &self.inner.load_gate,
                    "Did Load",
                    format!("{}:didLoad", p.full_path),
                    future,
                ))
            })
            .collect();

        // Every didLoad task is pending now; the timeout budget starts here.
        self.inner.load_gate.start();

        for task in tasks {
            self.spawn(task);
        }
        Ok(())
    }

    pub fn trigger_will_ready(&self) -> Result<(), LifecycleError> {
        self.advance(BootPhase::WillReady, "trigger willReady")?;
        self.set_state(LifecycleState::BootPending);
        tracing::debug!("Registering willReady tasks");

        let tasks: Vec<PreparedTask> = self
            .participants()
            .into_iter()
            .filter_map(|p| {
                let hook = p.hook.clone();
                let future = capability(move || hook.will_ready())?;
                Some(self.prepare(
                    &self.inner.boot_gate,
                    "Will Ready",
                    format!("{}:willReady", p.full_path),
                    future,
                ))
            })
            .collect();

        self.inner.boot_gate.start();

        for task in tasks {
            self.spawn(task);
        }
        Ok(())
    }

    /// Fan `didReady` out to every participant. Runs at most once.
    pub fn trigger_did_ready(&self, err: Option<LifecycleError>) -> Option<JoinHandle<()>> {
        if self.inner.did_ready_triggered.swap(true, Ordering::SeqCst) {
            return None;
        }
        tracing::debug!(error = ?err, "Triggering didReady");

        let tasks = self
            .participants()
            .into_iter()
            .filter_map(|p| {
                let hook = p.hook.clone();
                let err = err.clone();
                let future = capability(move || hook.did_ready(err))?;
                Some((format!("{}:didReady", p.full_path), future))
            })
            .collect();
        self.fan_out("didReady", tasks)
    }

    /// Fan `serverDidReady` out to every participant. Runs at most once.
    pub fn trigger_server_did_ready(&self) -> Option<JoinHandle<()>> {
        if self.inner.server_did_ready_triggered.swap(true, Ordering::SeqCst) {
            tracing::warn!("serverDidReady already triggered");
            return None;
        }

        let tasks = self
            .participants()
            .into_iter()
            .filter_map(|p| {
                let hook = p.hook.clone();
                let future = capability(move || hook.server_did_ready())?;
                Some((format!("{}:serverDidReady", p.full_path), future))
            })
            .collect();
        self.fan_out("serverDidReady", tasks)
    }

    /// Drain teardown callbacks newest first, then emit `close` and drop listeners.
    ///
    /// Failing callbacks do not stop the drain; their errors are returned
    /// together once it finishes. Calling again is a no-op.
    pub async fn close(&self) -> Result<(), LifecycleError> {
        {
            let mut state = lock(&self.inner.state);
            if matches!(*state, LifecycleState::Closing | LifecycleState::Closed) {
                tracing::debug!(state = %*state, "Close already in progress");
                return Ok(());
            }
            *state = LifecycleState::Closing;
        }

        tracing::info!(callbacks = self.inner.teardown.len(), "Closing application");
        let failures = self.inner.teardown.drain().await;

        self.inner.app.events().emit(&LifecycleEvent::Close);
        self.inner.events.remove_all_listeners();
        self.inner.app.events().remove_all_listeners();
        lock(&self.inner.participants).clear();
        self.set_state(LifecycleState::Closed);

        if failures.is_empty() {
            tracing::info!("Application closed");
            Ok(())
        } else {
            Err(LifecycleError::Teardown(failures))
        }
    }

    // --- Internals ---

    fn participants(&self) -> Vec<Participant> {
        lock(&self.inner.participants).clone()
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = lock(&self.inner.state);
        if matches!(*state, LifecycleState::Closing | LifecycleState::Closed) {
            return;
        }
        tracing::debug!(from = %*state, to = %next, "Lifecycle state change");
        *state = next;
    }

    /// Readiness only moves a booting lifecycle forward; it never skips
    /// `init()` or undoes a close.
    fn mark_ready(&self) {
        let mut state = lock(&self.inner.state);
        if matches!(*state, LifecycleState::LoadPending | LifecycleState::BootPending) {
            tracing::debug!(from = %*state, "Lifecycle state change to ready");
            *state = LifecycleState::Ready;
        }
    }

    /// Move to `next` only if it directly follows the current phase.
    fn advance(&self, next: BootPhase, operation: &'static str) -> Result<(), LifecycleError> {
        let mut progress = lock(&self.inner.progress);
        let expected = match next {
            BootPhase::ConfigWillLoad => None,
            BootPhase::ConfigDidLoad => Some(BootPhase::ConfigWillLoad),
            BootPhase::DidLoad => Some(BootPhase::ConfigDidLoad),
            BootPhase::WillReady => Some(BootPhase::DidLoad),
        };
        if *progress != expected {
            return Err(LifecycleError::invalid_state(operation, self.state()));
        }
        *progress = Some(next);
        Ok(())
    }

    /// A synchronous phase failed: resolve the load gate with the error.
    fn abort_boot(&self, task: String, source: HookError) -> LifecycleError {
        let err = LifecycleError::participant(task, source);
        tracing::error!(error = %err, "Boot phase failed");

        self.inner.load_gate.abort(err.clone());
        // Already resolved by an earlier before-start failure.
        self.inner.ready.fire(Err(err.clone()));
        err
    }

    /// Register a gated task and start its timing interval.
    fn prepare(
        &self,
        gate: &ReadinessGate,
        timing_prefix: &str,
        name: String,
        future: HookFuture,
    ) -> PreparedTask {
        let timing_key = format!(
            "{} in {}",
            timing_prefix,
            self.inner.app.resolve_source(&name)
        );
        self.inner.app.timing().start(timing_key.clone());
        let done = gate.register(name.clone());

        PreparedTask {
            name,
            timing_key,
            done,
            future,
        }
    }

    /// Run a prepared task on a later scheduling turn.
    ///
    /// Without a runtime the task cannot run, so it fails its gate instead.
    fn spawn(&self, task: PreparedTask) {
        let timing = self.inner.app.timing().clone();
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(task = %task.name, "No async runtime available, failing task");
                timing.end(&task.timing_key);
                let err = LifecycleError::participant(task.name, "no async runtime".into());
                task.done.fail(err);
                return;
            }
        };

        runtime.spawn(async move {
            let PreparedTask {
                name,
                timing_key,
                done,
                future,
            } = task;

            done.finish(run_hook(&name, future).await);
            timing.end(&timing_key);
        });
    }

    fn fan_out(
        &self,
        phase: &'static str,
        tasks: Vec<(String, HookFuture)>,
    ) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(phase, "No async runtime available, skipping fan-out");
                return None;
            }
        };

        let events = self.inner.events.clone();
        Some(runtime.spawn(async move {
            let mut set = JoinSet::new();
            for (name, future) in tasks {
                set.spawn(async move { run_hook(&name, future).await });
            }

            while let Some(joined) = set.join_next().await {
                let err = match joined {
                    Ok(Ok(())) => continue,
                    Ok(Err(err)) => err,
                    Err(join_err) => LifecycleError::participant(phase, join_err.into()),
                };
                metrics::record_hook_error(phase);
                tracing::error!(phase, error = %err, "Boot hook failed");
                events.emit(&LifecycleEvent::Error(err));
            }

            tracing::debug!(phase, "Fan-out finished");
        }))
    }

    fn log_events(&self) {
        let timeout_secs = self.inner.ready_timeout.as_secs_f64();
        self.inner.events.on(move |event| match event {
            LifecycleEvent::ReadyStat { phase, id, remain } => {
                tracing::info!(
                    phase = %phase,
                    remain = ?remain,
                    "[ready_stat] end ready task {}",
                    id
                );
            }
            LifecycleEvent::ReadyTimeout { phase, pending, .. } => {
                tracing::warn!(
                    phase = %phase,
                    timeout_secs,
                    "[ready_timeout] {} seconds later {:?} was still unable to finish",
                    timeout_secs,
                    pending
                );
            }
            LifecycleEvent::Error(err) => {
                tracing::error!(kind = err.kind(), error = %err, "Lifecycle error");
            }
            LifecycleEvent::Close => {}
        });
    }

    /// load gate → willReady → boot gate → ready → didReady.
    fn chain_gates(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.load_gate.on_ready(move |outcome| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let lifecycle = Lifecycle { inner };
            tracing::debug!(ok = outcome.is_ok(), "Load gate resolved");

            if let Err(err) = outcome {
                *lock(&lifecycle.inner.load_error) = Some(err);
            }

            if let Err(err) = lifecycle.trigger_will_ready() {
                // Boot never reached didLoad: report the load failure directly.
                let load_error = lock(&lifecycle.inner.load_error).take();
                lifecycle.inner.ready.fire(Err(load_error.unwrap_or(err)));
            }
        });

        let weak = Arc::downgrade(&self.inner);
        self.inner.boot_gate.on_ready(move |outcome| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let load_error = lock(&inner.load_error).take();
            let outcome = match load_error {
                Some(err) => Err(err),
                None => outcome,
            };
            inner.ready.fire(outcome);
        });

        let weak = Arc::downgrade(&self.inner);
        self.inner.ready.on_ready(move |outcome| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let lifecycle = Lifecycle { inner };

            match &outcome {
                Ok(()) => tracing::info!("Application ready"),
                Err(err) => tracing::error!(
                    error = %err,
                    timeout_ms = lifecycle.inner.ready_timeout.as_millis() as u64,
                    "Application failed to become ready"
                ),
            }

            lifecycle.mark_ready();
            lifecycle.inner.app.timing().end(APPLICATION_START);
            lifecycle.trigger_did_ready(outcome.err());
        });
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .field("load_gate", &self.inner.load_gate)
            .field("boot_gate", &self.inner.boot_gate)
            .field("teardown", &self.inner.teardown)
            .finish()
    }
}

/// Run a synchronous hook callback, turning a panic into an error.
fn call_sync<F>(callback: F) -> HookResult
where
    F: FnOnce() -> HookResult,
{
    std::panic::catch_unwind(AssertUnwindSafe(callback))
        .unwrap_or_else(|panic| Err(panic_message(panic).into()))
}

/// Ask a hook for its phase future.
///
/// A panic in the synchronous part of the callback becomes a future that
/// fails, so it is reported like any other hook error.
fn capability<F>(callback: F) -> Option<HookFuture>
where
    F: FnOnce() -> Option<HookFuture>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(future) => future,
        Err(panic) => {
            let message = panic_message(panic);
            Some(async move { Err::<(), HookError>(message.into()) }.boxed())
        }
    }
}

/// Await a hook future, turning errors and panics into participant errors.
pub(crate) async fn run_hook(name: &str, future: HookFuture) -> Result<(), LifecycleError> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(LifecycleError::participant(name, e)),
        Err(panic) => Err(LifecycleError::participant(name, panic_message(panic).into())),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> Lifecycle {
        let app = Arc::new(Application::new("test", "/srv/test"));
        Lifecycle::new(app, &LifecycleConfig::default())
    }

    struct Noop;
    impl BootHook for Noop {}

    #[test]
    fn test_init_twice_fails() {
        let lifecycle = lifecycle();
        lifecycle.init().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Initialized);

        let err = lifecycle.init().unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidState {
                operation: "init",
                state: LifecycleState::Initialized
            }
        ));
    }

    #[test]
    fn test_add_hook_after_init_fails() {
        let lifecycle = lifecycle();
        lifecycle.add_boot_hook("early.rs", |_| Noop).unwrap();
        lifecycle.init().unwrap();

        let err = lifecycle.add_boot_hook("late.rs", |_| Noop).unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
        let err = lifecycle.add_function_hook("late.rs", |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }

    #[test]
    fn test_phases_require_order() {
        let lifecycle = lifecycle();
        assert!(lifecycle.trigger_config_will_load().is_err());
        assert!(lifecycle.trigger_did_load().is_err());
        assert!(lifecycle.trigger_will_ready().is_err());
    }

    #[test]
    fn test_load_gate_held_until_did_load() {
        let lifecycle = lifecycle();
        let early = lifecycle.ready_callback("legacy");
        assert_eq!(lifecycle.load_gate().pending(), vec!["legacy".to_string()]);
        early.ready();

        assert!(!lifecycle.load_gate().is_started());
        assert!(!lifecycle.load_gate().is_resolved());
        assert!(lifecycle.load_gate().pending().is_empty());
        assert_eq!(lifecycle.state(), LifecycleState::Created);
    }

    struct PanicsInConfig;
    impl BootHook for PanicsInConfig {
        fn config_did_load(&self) -> HookResult {
            panic!("config parser bug");
        }
    }

    #[test]
    fn test_sync_phase_panic_becomes_participant_error() {
        let lifecycle = lifecycle();
        lifecycle.add_boot_hook("bad.rs", |_| PanicsInConfig).unwrap();
        lifecycle.init().unwrap();

        let err = lifecycle.trigger_config_will_load().unwrap_err();
        assert_eq!(err.kind(), "participant");
        assert!(err.to_string().contains("bad.rs:configDidLoad"));
        assert!(err.to_string().contains("config parser bug"));

        let outcome = lifecycle.outcome().unwrap();
        assert_eq!(outcome.unwrap_err().kind(), "participant");
        assert_eq!(lifecycle.state(), LifecycleState::Initialized);
    }

    struct LoadsSomething;
    impl BootHook for LoadsSomething {
        fn did_load(self: Arc<Self>) -> Option<HookFuture> {
            Some(async { Ok::<(), HookError>(()) }.boxed())
        }
    }

    #[test]
    fn test_gated_task_without_runtime_fails_its_gate() {
        let lifecycle = lifecycle();
        lifecycle.add_boot_hook("loader.rs", |_| LoadsSomething).unwrap();
        lifecycle.init().unwrap();
        lifecycle.trigger_config_will_load().unwrap();

        let err = lifecycle.load_gate().outcome().unwrap().unwrap_err();
        assert!(err.to_string().contains("loader.rs:didLoad"));
        assert!(err.to_string().contains("no async runtime"));
        assert!(lifecycle.outcome().unwrap().is_err());
    }

    #[test]
    fn test_capability_panic_becomes_failing_future() {
        let future = capability(|| panic!("sync part")).unwrap();
        let result = futures_util::FutureExt::now_or_never(future).unwrap();
        assert_eq!(result.unwrap_err().to_string(), "panicked: sync part");

        assert!(capability(|| None).is_none());
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("boom")), "panicked: boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "panicked: bang");
        assert_eq!(panic_message(Box::new(7u8)), "panicked");
    }
}
