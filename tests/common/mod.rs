//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;

use boot_lifecycle::config::LifecycleConfig;
use boot_lifecycle::lifecycle::{
    BootHook, EventBus, HookFuture, HookResult, Lifecycle, LifecycleError, LifecycleEvent,
};
use boot_lifecycle::Application;

pub const BASE_DIR: &str = "/srv/demo";

/// Build a lifecycle over a fresh application with the given gate timeout.
pub fn lifecycle(ready_timeout_ms: u64) -> Lifecycle {
    let app = Arc::new(Application::new("demo", BASE_DIR));
    let config = LifecycleConfig {
        ready_timeout_ms,
        ..LifecycleConfig::default()
    };
    Lifecycle::new(app, &config)
}

/// Thread-safe append-only log of `"<hook>:<phase>"` entries.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

/// How a recording hook behaves in its asynchronous phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Delay(Duration),
    Fail,
    Hang,
}

/// Hook that logs every phase it takes part in.
pub struct RecordingHook {
    pub name: &'static str,
    pub log: Recorder,
    pub did_load: Behavior,
    pub will_ready: Behavior,
}

impl RecordingHook {
    pub fn new(name: &'static str, log: &Recorder) -> Self {
        Self {
            name,
            log: log.clone(),
            did_load: Behavior::Succeed,
            will_ready: Behavior::Succeed,
        }
    }

    pub fn did_load(mut self, behavior: Behavior) -> Self {
        self.did_load = behavior;
        self
    }

    pub fn will_ready(mut self, behavior: Behavior) -> Self {
        self.will_ready = behavior;
        self
    }

    fn record(&self, phase: &str) {
        self.log.push(format!("{}:{}", self.name, phase));
    }

    fn run(self: Arc<Self>, phase: &'static str, behavior: Behavior) -> HookFuture {
        async move {
            match behavior {
                Behavior::Succeed => {}
                Behavior::Delay(d) => tokio::time::sleep(d).await,
                Behavior::Fail => {
                    self.record(&format!("{}:failed", phase));
                    return Err(format!("{} {} failed", self.name, phase).into());
                }
                Behavior::Hang => std::future::pending::<()>().await,
            }
            self.record(phase);
            Ok(())
        }
        .boxed()
    }
}

impl BootHook for RecordingHook {
    fn config_will_load(&self) -> HookResult {
        self.record("configWillLoad");
        Ok(())
    }

    fn config_did_load(&self) -> HookResult {
        self.record("configDidLoad");
        Ok(())
    }

    fn did_load(self: Arc<Self>) -> Option<HookFuture> {
        let behavior = self.did_load;
        Some(self.run("didLoad", behavior))
    }

    fn will_ready(self: Arc<Self>) -> Option<HookFuture> {
        let behavior = self.will_ready;
        Some(self.run("willReady", behavior))
    }

    fn did_ready(self: Arc<Self>, err: Option<LifecycleError>) -> Option<HookFuture> {
        let entry = match err {
            Some(err) => format!("{}:didReady:{}", self.name, err.kind()),
            None => format!("{}:didReady", self.name),
        };
        self.log.push(entry);
        None
    }

    fn server_did_ready(self: Arc<Self>) -> Option<HookFuture> {
        Some(self.run("serverDidReady", Behavior::Succeed))
    }

    fn before_close(self: Arc<Self>) -> Option<HookFuture> {
        Some(self.run("beforeClose", Behavior::Succeed))
    }
}

/// Collects every event emitted on a bus.
#[derive(Clone, Default)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl EventCollector {
    pub fn attach(bus: &EventBus) -> Self {
        let collector = Self::default();
        let sink = collector.events.clone();
        bus.on(move |event| sink.lock().unwrap().push(event.clone()));
        collector
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(LifecycleEvent::name).collect()
    }
}
