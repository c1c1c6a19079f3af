//! Gateway lifecycle: construction, serving, reload, shutdown.

use anyhow::Context;
use notify::RecommendedWatcher;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use super::http_server::{HttpServer, ServerHandle};
use super::service::GatewayService;
use crate::config::{Environment, ServiceConfig};
use crate::dispatcher::Dispatcher;
use crate::hot_reload::watch_config;
use crate::registry::ComponentRegistry;
use crate::router::build_table;
use crate::switcher::Switcher;

/// Owns the process-wide pieces: the configuration, the component
/// registry, the dispatcher with its atomically swapped route table, and
/// the config watcher. One instance per served gateway; no globals.
pub struct Gateway {
    config: ServiceConfig,
    config_path: PathBuf,
    registry: Arc<ComponentRegistry>,
    dispatcher: Arc<Dispatcher>,
    watcher: Option<RecommendedWatcher>,
    in_flight: Option<Arc<AtomicUsize>>,
    backend_stop: Option<Box<dyn FnOnce() + Send>>,
}

/// Bound on how long shutdown waits for in-flight requests to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

impl Gateway {
    /// Load the config, build the initial route table against the given
    /// registry and switcher, and validate all wiring. Errors here are
    /// fatal by design: a gateway never starts serving a half-wired table.
    pub fn new(
        config_path: impl AsRef<Path>,
        registry: ComponentRegistry,
        switcher: Switcher,
    ) -> anyhow::Result<Self> {
        let config_path = config_path.as_ref().to_path_buf();
        let config = ServiceConfig::load(&config_path)?;
        let registry = Arc::new(registry);
        let mappings = config.parsed_mappings()?;
        let table = build_table(&mappings, &config.bindings, &registry)?;
        let dispatcher = Arc::new(Dispatcher::new(table, switcher)?);
        Ok(Self {
            config,
            config_path,
            registry,
            dispatcher,
            watcher: None,
            in_flight: None,
            backend_stop: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// Hook run after the HTTP side has fully stopped, so a co-started RPC
    /// backend is never torn down under a bridged in-flight request.
    pub fn on_backend_stop(&mut self, stop: impl FnOnce() + Send + 'static) {
        self.backend_stop = Some(Box::new(stop));
    }

    /// Re-derive the declarative mapping and republish the route table.
    /// On any error the currently published table stays live.
    pub fn reload(&self) -> anyhow::Result<usize> {
        rebuild(&self.config_path, &self.registry, &self.dispatcher)
    }

    /// Start watching the config file; changes trigger [`Gateway::reload`].
    pub fn watch(&mut self) -> anyhow::Result<()> {
        let config_path = self.config_path.clone();
        let registry = self.registry.clone();
        let dispatcher = self.dispatcher.clone();
        let watcher = watch_config(&self.config_path, move || {
            rebuild(&config_path, &registry, &dispatcher)
        })?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Start the HTTP server and the config watcher.
    pub fn start(&mut self) -> anyhow::Result<ServerHandle> {
        self.watch()?;
        let addr = format!("0.0.0.0:{}", self.config.http_port);
        let service = GatewayService::new(self.dispatcher.clone());
        self.in_flight = Some(service.in_flight());
        let handle = HttpServer(service)
            .start(&addr)
            .with_context(|| format!("failed to bind HTTP server on {addr}"))?;
        info!(
            service = %self.config.service_name,
            addr = %addr,
            routes = self.dispatcher.table().len(),
            "HTTP server started"
        );
        Ok(handle)
    }

    /// Graceful shutdown: stop accepting, drain requests already inside
    /// the pipeline (bounded by [`SHUTDOWN_GRACE`]), then run the backend
    /// stop hook. The backend is never torn down under a bridged in-flight
    /// request that finishes within the grace period.
    pub fn stop(mut self, handle: ServerHandle) {
        info!(service = %self.config.service_name, "HTTP server stopping");
        self.watcher.take();
        handle.stop();
        if let Some(in_flight) = self.in_flight.take() {
            drain(&in_flight);
        }
        info!(service = %self.config.service_name, "HTTP server stopped");
        if let Some(stop) = self.backend_stop.take() {
            stop();
            info!(service = %self.config.service_name, "backend stopped");
        }
    }

    /// Serve until SIGINT/SIGTERM, reloading on SIGHUP, then shut down
    /// gracefully.
    #[cfg(unix)]
    pub fn run(self, handle: ServerHandle) -> anyhow::Result<()> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGHUP, SIGINT, SIGTERM])?;
        for signal in signals.forever() {
            if signal == SIGHUP {
                match self.reload() {
                    Ok(routes) => info!(routes, "reload on SIGHUP complete"),
                    Err(e) => tracing::warn!(error = %e, "reload on SIGHUP rejected"),
                }
            } else {
                break;
            }
        }
        self.stop(handle);
        Ok(())
    }
}

/// Wait for requests already past accept to finish. The listener is down
/// at this point, so the count only decreases.
fn drain(in_flight: &AtomicUsize) {
    let deadline = Instant::now() + SHUTDOWN_GRACE;
    loop {
        let pending = in_flight.load(Ordering::SeqCst);
        if pending == 0 {
            return;
        }
        if Instant::now() >= deadline {
            tracing::warn!(pending, "shutdown grace period elapsed with requests in flight");
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn rebuild(
    config_path: &Path,
    registry: &ComponentRegistry,
    dispatcher: &Dispatcher,
) -> anyhow::Result<usize> {
    let config = ServiceConfig::load(config_path)?;
    let mappings = config.parsed_mappings()?;
    let table = build_table(&mappings, &config.bindings, registry)?;
    dispatcher.install(table)
}

/// Initialize tracing from the service configuration: env-filter override,
/// environment-based default verbosity, optional log file. Returns the
/// appender guard which must be held for the process lifetime when a log
/// path is configured.
pub fn init_logging(config: &ServiceConfig) -> Option<WorkerGuard> {
    let default_directive = match config.environment {
        Environment::Development => "debug",
        Environment::Production => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    if let Some(log_path) = &config.log_path {
        let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
        let file = log_path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.log", config.service_name));
        let appender = tracing_appender::rolling::never(dir, file);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .try_init();
        Some(guard)
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        None
    }
}
