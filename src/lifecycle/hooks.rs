//! Boot hooks and their registry.
//!
//! A boot hook is one unit of application bootstrap logic. Every phase
//! callback is optional; the default implementations mean "nothing to do".
//! Asynchronous phases return `None` when the hook does not take part, so the
//! orchestrator only registers gate tasks for hooks that do.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::app::Application;
use crate::lifecycle::error::{HookResult, LifecycleError};
use crate::lifecycle::orchestrator::LifecycleState;

/// Future returned by asynchronous hook callbacks.
pub type HookFuture = BoxFuture<'static, HookResult>;

/// Constructs a hook instance from the host application.
pub type HookFactory = Box<dyn FnOnce(Arc<Application>) -> Arc<dyn BootHook> + Send>;

type BootFn = Arc<dyn Fn(&Arc<Application>) -> HookResult + Send + Sync>;

/// Application-specific bootstrap logic, one callback per lifecycle phase.
///
/// Asynchronous callbacks take `self: Arc<Self>` so the returned future can
/// outlive the call; the future is polled on a later scheduling turn, never
/// inside the registering call.
///
/// Calling an asynchronous callback only asks whether the hook takes part in
/// that phase. Put the phase's work inside the returned future: the call
/// itself happens while sibling hooks are still being registered, and
/// `before_close` is called at `init()`, long before close.
pub trait BootHook: Send + Sync + 'static {
    /// Config files are about to load. Last chance to modify them.
    fn config_will_load(&self) -> HookResult {
        Ok(())
    }

    /// Config has loaded.
    fn config_did_load(&self) -> HookResult {
        Ok(())
    }

    /// All files loaded; gated on the load gate.
    fn did_load(self: Arc<Self>) -> Option<HookFuture> {
        None
    }

    /// All plugins started; gated on the boot gate.
    fn will_ready(self: Arc<Self>) -> Option<HookFuture> {
        None
    }

    /// The application is ready, or failed to become ready with `err`.
    fn did_ready(self: Arc<Self>, err: Option<LifecycleError>) -> Option<HookFuture> {
        let _ = err;
        None
    }

    /// The host's server is accepting connections.
    fn server_did_ready(self: Arc<Self>) -> Option<HookFuture> {
        None
    }

    /// The application is closing.
    fn before_close(self: Arc<Self>) -> Option<HookFuture> {
        None
    }
}

/// A discovered hook definition, tagged by authoring style.
pub enum BootHookDef {
    /// A full multi-phase hook built by its factory.
    Typed { full_path: String, factory: HookFactory },
    /// A plain function run once during `configDidLoad`.
    Function { full_path: String, boot: BootFn },
}

impl BootHookDef {
    pub fn typed<F, H>(full_path: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce(Arc<Application>) -> H + Send + 'static,
        H: BootHook,
    {
        BootHookDef::Typed {
            full_path: full_path.into(),
            factory: Box::new(move |app| Arc::new(factory(app)) as Arc<dyn BootHook>),
        }
    }

    pub fn function<F>(full_path: impl Into<String>, boot: F) -> Self
    where
        F: Fn(&Arc<Application>) -> HookResult + Send + Sync + 'static,
    {
        BootHookDef::Function {
            full_path: full_path.into(),
            boot: Arc::new(boot),
        }
    }

    pub fn full_path(&self) -> &str {
        match self {
            BootHookDef::Typed { full_path, .. } | BootHookDef::Function { full_path, .. } => {
                full_path
            }
        }
    }
}

impl std::fmt::Debug for BootHookDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let style = match self {
            BootHookDef::Typed { .. } => "typed",
            BootHookDef::Function { .. } => "function",
        };
        f.debug_struct("BootHookDef")
            .field("style", &style)
            .field("full_path", &self.full_path())
            .finish()
    }
}

/// Wraps a function-style hook so it runs during `configDidLoad`.
struct FunctionHook {
    app: Arc<Application>,
    boot: BootFn,
}

impl BootHook for FunctionHook {
    fn config_did_load(&self) -> HookResult {
        (self.boot)(&self.app)
    }
}

/// An instantiated hook together with its source identifier.
#[derive(Clone)]
pub struct Participant {
    pub full_path: String,
    pub hook: Arc<dyn BootHook>,
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("full_path", &self.full_path)
            .finish()
    }
}

/// Ordered list of hook definitions awaiting instantiation.
#[derive(Debug, Default)]
pub struct HookRegistry {
    pending: Vec<BootHookDef>,
    instantiated: bool,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition. Fails once hooks have been instantiated.
    pub fn add(&mut self, def: BootHookDef) -> Result<(), LifecycleError> {
        if self.instantiated {
            return Err(LifecycleError::invalid_state(
                "add boot hook",
                LifecycleState::Initialized,
            ));
        }
        tracing::debug!(full_path = %def.full_path(), "Boot hook added");
        self.pending.push(def);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Construct every hook in registration order. Callable once.
    pub fn instantiate_all(
        &mut self,
        app: &Arc<Application>,
    ) -> Result<Vec<Participant>, LifecycleError> {
        if self.instantiated {
            return Err(LifecycleError::invalid_state(
                "instantiate boot hooks",
                LifecycleState::Initialized,
            ));
        }
        self.instantiated = true;

        let participants = self
            .pending
            .drain(..)
            .map(|def| match def {
                BootHookDef::Typed { full_path, factory } => Participant {
                    hook: factory(app.clone()),
                    full_path,
                },
                BootHookDef::Function { full_path, boot } => Participant {
                    hook: Arc::new(FunctionHook {
                        app: app.clone(),
                        boot,
                    }),
                    full_path,
                },
            })
            .collect();

        Ok(participants)
    }
}
