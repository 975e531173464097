//! Named start/end interval recording.
//!
//! Every boot phase and gated task records an interval here; the host
//! exposes the snapshot for diagnosing slow startups.

use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;

use crate::observability::metrics;

/// One recorded interval.
#[derive(Debug, Clone, Serialize)]
pub struct TimingItem {
    pub name: String,
    /// Wall-clock start, milliseconds since the epoch.
    pub start: u64,
    pub end: Option<u64>,
    pub duration_ms: Option<u64>,
    pub pid: u32,
    pub index: usize,
}

struct OpenInterval {
    index: usize,
    started: Instant,
}

/// Thread-safe recorder of named intervals.
#[derive(Default)]
pub struct TimingRecorder {
    items: Mutex<Vec<TimingItem>>,
    /// name -> open interval
    open: DashMap<String, OpenInterval>,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an interval. Restarting a name that is still open replaces it.
    pub fn start(&self, name: impl Into<String>) {
        let name = name.into();
        let mut items = self.lock_items();
        let index = items.len();

        items.push(TimingItem {
            name: name.clone(),
            start: now_millis(),
            end: None,
            duration_ms: None,
            pid: std::process::id(),
            index,
        });

        self.open.insert(
            name,
            OpenInterval {
                index,
                started: Instant::now(),
            },
        );
    }

    /// End an interval. Unknown or already-ended names are ignored.
    pub fn end(&self, name: &str) {
        let Some((name, open)) = self.open.remove(name) else {
            tracing::debug!(name = %name, "Timing end without matching start");
            return;
        };

        let elapsed = open.started.elapsed();
        if let Some(item) = self.lock_items().get_mut(open.index) {
            item.end = Some(now_millis());
            item.duration_ms = Some(elapsed.as_millis() as u64);
        }

        metrics::record_timing(&name, elapsed);
    }

    /// All intervals in start order.
    pub fn snapshot(&self) -> Vec<TimingItem> {
        self.lock_items().clone()
    }

    pub fn get(&self, name: &str) -> Option<TimingItem> {
        self.lock_items()
            .iter()
            .rev()
            .find(|item| item.name == name)
            .cloned()
    }

    fn lock_items(&self) -> std::sync::MutexGuard<'_, Vec<TimingItem>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for TimingRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingRecorder")
            .field("items", &self.snapshot().len())
            .finish()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
