//! Host application reference handed to every boot hook.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::lifecycle::events::EventBus;
use crate::observability::TimingRecorder;

/// The application being booted.
///
/// Hooks receive it at construction; the lifecycle uses its event bus for the
/// terminal `close` event and its timing recorder for phase intervals.
#[derive(Debug)]
pub struct Application {
    name: String,
    base_dir: PathBuf,
    events: EventBus,
    timing: Arc<TimingRecorder>,
}

impl Application {
    pub fn new(name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
            events: EventBus::new(),
            timing: Arc::new(TimingRecorder::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn timing(&self) -> &Arc<TimingRecorder> {
        &self.timing
    }

    /// Report `source` relative to the base directory, with `/` separators.
    pub fn resolve_source(&self, source: &str) -> String {
        let relative = Path::new(source)
            .strip_prefix(&self.base_dir)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| source.to_string());
        relative.replace('\\', "/")
    }
}
