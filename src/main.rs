//! Boot host.
//!
//! Boots the built-in hooks through the full lifecycle and serves their
//! progress over HTTP.
//!
//! ```text
//!   config (TOML + READY_TIMEOUT_ENV)
//!        │
//!        ▼
//!   load_boot_hooks ──▶ configWillLoad ──▶ configDidLoad ──▶ didLoad ─┐
//!                                                                     │ load gate
//!        ┌────────────────────────────────────────────────────────────┘
//!        ▼
//!   willReady ──▶ boot gate ──▶ ready ──▶ didReady
//!        │
//!        ▼
//!   status server up ──▶ serverDidReady
//!        │
//!   SIGINT/SIGTERM ──▶ close() (teardown newest first)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::FutureExt;
use tokio::net::TcpListener;

use boot_lifecycle::admin;
use boot_lifecycle::config::{load_config, load_default};
use boot_lifecycle::lifecycle::signals::wait_for_shutdown_signal;
use boot_lifecycle::lifecycle::{
    load_boot_hooks, BootHook, BootHookDef, BootUnit, HookError, HookFuture, HookResult,
    Lifecycle, LifecycleError, Shutdown, StaticDiscovery,
};
use boot_lifecycle::observability::{logging::init_logging, metrics::init_metrics};
use boot_lifecycle::Application;

#[derive(Parser)]
#[command(name = "boot-host")]
#[command(about = "Boots an application through its lifecycle phases", long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_default()?,
    };

    init_logging(&config.observability);
    tracing::info!("boot-host v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        ready_timeout_ms = config.lifecycle.ready_timeout_ms,
        base_dir = %config.lifecycle.base_dir,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let app = Arc::new(Application::new("boot-host", &config.lifecycle.base_dir));
    let lifecycle = Lifecycle::new(app.clone(), &config.lifecycle);

    let mut discovery = builtin_hooks(&app);
    load_boot_hooks(&lifecycle, &mut discovery, BootUnit::App)?;

    if let Err(err) = lifecycle.ready().await {
        tracing::error!(error = %err, "Boot failed, closing");
        if let Err(close_err) = lifecycle.close().await {
            tracing::error!(error = %close_err, "Close failed");
        }
        return Err(err.into());
    }

    if config.server.enabled {
        let listener = TcpListener::bind(&config.server.bind_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, "Status server listening");

        let shutdown = Shutdown::new();
        let server = tokio::spawn(admin::serve(listener, lifecycle.clone(), shutdown.clone()));
        lifecycle.register_before_close("status server", move || async move {
            shutdown.trigger();
            server.await??;
            Ok::<(), HookError>(())
        })?;

        lifecycle.trigger_server_did_ready();
    }

    let signal = wait_for_shutdown_signal().await;
    tracing::info!(signal, "Shutdown signal received");

    lifecycle.close().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn builtin_hooks(app: &Application) -> StaticDiscovery {
    let source = |name: &str| app.base_dir().join(name).to_string_lossy().into_owned();
    let base_dir = app.base_dir().to_path_buf();

    StaticDiscovery::new()
        .with(
            BootUnit::App,
            BootHookDef::function(source("boot/base_dir.rs"), move |_| {
                if base_dir.is_dir() {
                    Ok(())
                } else {
                    Err(format!("base_dir {} is not a directory", base_dir.display()).into())
                }
            }),
        )
        .with(
            BootUnit::App,
            BootHookDef::typed(source("boot/warmup.rs"), |app| Warmup {
                app,
                delay: Duration::from_millis(50),
            }),
        )
}

/// Simulates a resource that takes a moment to become usable.
struct Warmup {
    app: Arc<Application>,
    delay: Duration,
}

impl BootHook for Warmup {
    fn config_did_load(&self) -> HookResult {
        tracing::debug!(app = %self.app.name(), "Warmup configured");
        Ok(())
    }

    fn did_load(self: Arc<Self>) -> Option<HookFuture> {
        Some(
            async move {
                tokio::time::sleep(self.delay).await;
                tracing::info!(delay_ms = self.delay.as_millis() as u64, "Warmup loaded");
                Ok(())
            }
            .boxed(),
        )
    }

    fn will_ready(self: Arc<Self>) -> Option<HookFuture> {
        Some(
            async move {
                tracing::info!(app = %self.app.name(), "Warmup ready");
                Ok(())
            }
            .boxed(),
        )
    }

    fn did_ready(self: Arc<Self>, err: Option<LifecycleError>) -> Option<HookFuture> {
        if let Some(err) = err {
            tracing::warn!(error = %err, "Warmup saw a failed boot");
        }
        None
    }

    fn server_did_ready(self: Arc<Self>) -> Option<HookFuture> {
        Some(
            async move {
                let timings = self.app.timing().snapshot();
                tracing::info!(intervals = timings.len(), "Serving status");
                Ok(())
            }
            .boxed(),
        )
    }

    fn before_close(self: Arc<Self>) -> Option<HookFuture> {
        Some(
            async move {
                tracing::info!("Warmup released");
                Ok(())
            }
            .boxed(),
        )
    }
}
