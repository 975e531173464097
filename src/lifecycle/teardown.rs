//! Teardown registry.
//!
//! Callbacks run last-registered first, one at a time: a resource acquired
//! later may depend on an earlier one staying alive while it shuts down.

use std::future::Future;
use std::sync::Mutex;

use futures_util::FutureExt;

use crate::lifecycle::error::{HookResult, LifecycleError};
use crate::lifecycle::hooks::HookFuture;
use crate::lifecycle::orchestrator::run_hook;
use crate::observability::metrics;

type TeardownFn = Box<dyn FnOnce() -> HookFuture + Send>;

/// Identifier of a registered teardown callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeardownId(u64);

struct Entry {
    id: TeardownId,
    label: String,
    /// Taken while the callback runs; the entry itself stays until it finishes.
    callback: Option<TeardownFn>,
}

#[derive(Default)]
struct Entries {
    next_id: u64,
    list: Vec<Entry>,
}

/// Insertion-ordered set of shutdown callbacks.
#[derive(Default)]
pub struct TeardownRegistry {
    entries: Mutex<Entries>,
}

impl TeardownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to run on [`drain`](Self::drain).
    pub fn register<F, Fut>(&self, label: impl Into<String>, callback: F) -> TeardownId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let mut entries = self.lock();
        let id = TeardownId(entries.next_id);
        entries.next_id += 1;
        entries.list.push(Entry {
            id,
            label: label.into(),
            callback: Some(Box::new(move || callback().boxed())),
        });
        id
    }

    /// Number of callbacks not yet finished, including one currently running.
    pub fn len(&self) -> usize {
        self.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().list.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.lock().list.iter().map(|e| e.label.clone()).collect()
    }

    /// Run every callback in reverse registration order.
    ///
    /// Each entry is removed once its callback finishes, whether it succeeded
    /// or not. Failures do not stop the drain; they are returned together.
    pub async fn drain(&self) -> Vec<LifecycleError> {
        let mut failures = Vec::new();

        while let Some((id, label, callback)) = self.take_last() {
            tracing::debug!(label = %label, "Running teardown callback");

            let result = run_hook(&label, callback()).await;
            self.remove(id);

            if let Err(err) = result {
                tracing::error!(label = %label, error = %err, "Teardown callback failed");
                metrics::record_hook_error("beforeClose");
                failures.push(err);
            }
        }

        failures
    }

    fn take_last(&self) -> Option<(TeardownId, String, TeardownFn)> {
        let mut entries = self.lock();
        let entry = entries
            .list
            .iter_mut()
            .rev()
            .find(|e| e.callback.is_some())?;
        let callback = entry.callback.take()?;
        Some((entry.id, entry.label.clone(), callback))
    }

    fn remove(&self, id: TeardownId) {
        self.lock().list.retain(|e| e.id != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for TeardownRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownRegistry")
            .field("labels", &self.labels())
            .finish()
    }
}
