//! Observer lists for lifecycle signalling.
//!
//! Gates report progress to the orchestrator, and the orchestrator reports to
//! the host, through an [`EventBus`]: a list of listeners invoked in
//! subscription order. Listeners are called outside the internal lock, so a
//! listener may subscribe or emit again without deadlocking.

use std::sync::{Arc, Mutex};

use crate::lifecycle::error::LifecycleError;

/// Events emitted by readiness gates, the orchestrator, and the host application.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// A gated task finished; carries the remaining pending ids.
    ReadyStat {
        phase: String,
        id: String,
        remain: Vec<String>,
    },
    /// A gate timed out with these tasks still pending.
    ReadyTimeout {
        phase: String,
        pending: Vec<String>,
        timeout_ms: u64,
    },
    /// A task or phase failure.
    Error(LifecycleError),
    /// Terminal signal emitted once teardown has drained.
    Close,
}

impl LifecycleEvent {
    /// Stable event name, mirroring the names hosts subscribe to.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::ReadyStat { .. } => "ready_stat",
            LifecycleEvent::ReadyTimeout { .. } => "ready_timeout",
            LifecycleEvent::Error(_) => "error",
            LifecycleEvent::Close => "close",
        }
    }
}

type Listener = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Identifier returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

/// A cloneable handle to a shared list of event listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener to every event emitted on this bus.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.lock();
        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    /// Remove a single listener. Returns false if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry, _)| *entry != id);
        listeners.entries.len() != before
    }

    /// Deliver an event to all current listeners.
    pub fn emit(&self, event: &LifecycleEvent) {
        let snapshot: Vec<Listener> = self
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    pub fn remove_all_listeners(&self) {
        self.lock().entries.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Listeners> {
        // Listener lists hold no invariants a panicking listener could break.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
