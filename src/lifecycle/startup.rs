//! Boot hook loading.
//!
//! # Responsibilities
//! - Take the hook definitions discovered for a unit (`app` or `agent`)
//! - Register them in discovery order and initialize the lifecycle
//! - Kick off the phase chain with `configWillLoad`
//!
//! Discovery itself (walking load units, resolving files) belongs to the
//! host; it plugs in through [`HookDiscovery`].

use std::collections::HashMap;

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::hooks::BootHookDef;
use crate::lifecycle::orchestrator::Lifecycle;

/// Well-known boot hook units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootUnit {
    App,
    Agent,
}

impl BootUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootUnit::App => "app",
            BootUnit::Agent => "agent",
        }
    }
}

impl std::fmt::Display for BootUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supplies hook definitions for a unit in a deterministic order.
pub trait HookDiscovery {
    fn discover(&mut self, unit: BootUnit) -> Vec<BootHookDef>;
}

/// Discovery backed by definitions handed over up front.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    units: HashMap<BootUnit, Vec<BootHookDef>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, unit: BootUnit, def: BootHookDef) -> Self {
        self.units.entry(unit).or_default().push(def);
        self
    }
}

impl HookDiscovery for StaticDiscovery {
    fn discover(&mut self, unit: BootUnit) -> Vec<BootHookDef> {
        self.units.remove(&unit).unwrap_or_default()
    }
}

/// Register every hook discovered for `unit`, initialize, and start the phase chain.
pub fn load_boot_hooks<D>(
    lifecycle: &Lifecycle,
    discovery: &mut D,
    unit: BootUnit,
) -> Result<(), LifecycleError>
where
    D: HookDiscovery + ?Sized,
{
    let timing_key = format!("Load {}", unit);
    let timing = lifecycle.app().timing().clone();
    timing.start(timing_key.clone());

    let defs = discovery.discover(unit);
    tracing::info!(unit = %unit, hooks = defs.len(), "Loading boot hooks");

    for def in defs {
        lifecycle.add_hook(def)?;
    }
    lifecycle.init()?;
    timing.end(&timing_key);

    lifecycle.trigger_config_will_load()
}
