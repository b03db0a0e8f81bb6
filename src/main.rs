//! Volume Dial - dial plugin driving the system output volume
//!
//! Launched by the host application with `-port -pluginUUID -registerEvent
//! -info`, or run by hand with `--console` to drive the engine from a prompt.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use volume_dial::backend::{SimulatedBackend, VolumeBackend};
use volume_dial::cli::{normalize_host_args, run_console};
use volume_dial::config::{AppConfig, ConfigWatcher};
use volume_dial::engine::{FeedbackBroadcaster, VolumeActor, VolumeActorHandle, UNKNOWN_BASELINE};
use volume_dial::host::HostConnection;
use volume_dial::paths::AppPaths;

/// Volume Dial - coalescing volume control for rotary dials
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the platform data directory)
    #[arg(short, long, env = "VOLUME_DIAL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Use the in-memory mixer instead of the configured backend
    #[arg(long)]
    simulate: bool,

    /// Host websocket port
    #[arg(long, requires_all = ["plugin_uuid", "register_event"])]
    port: Option<u16>,

    /// Registration token handed over by the host
    #[arg(long)]
    plugin_uuid: Option<String>,

    /// Registration event name expected by the host
    #[arg(long)]
    register_event: Option<String>,

    /// Host/device description JSON (informational)
    #[arg(long)]
    info: Option<String>,

    /// Run an interactive console instead of connecting to a host
    #[arg(long, conflicts_with = "port")]
    console: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse_from(normalize_host_args(std::env::args()));

    let mut paths = AppPaths::detect();
    if let Some(config) = &args.config {
        paths = paths.with_config(config);
    }
    paths
        .ensure_directories()
        .context("Failed to create application directories")?;

    // Keep the guard alive for the whole run, it flushes the file log on drop
    let _log_guard = init_logging(&args.log_level, &paths.logs_dir)?;

    info!("Starting Volume Dial v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", paths.config.display());
    info!("Logs directory: {}", paths.logs_dir.display());

    if let Some(raw) = &args.info {
        match serde_json::from_str::<Value>(raw) {
            Ok(host_info) => debug!(?host_info, "Host info"),
            Err(e) => warn!("Ignoring unparsable host info: {}", e),
        }
    }

    let (config_watcher, config) = match ConfigWatcher::new(paths.config.clone()).await {
        Ok((watcher, config)) => {
            info!("Configuration loaded with hot-reload enabled");
            (Some(watcher), (*config).clone())
        }
        Err(e) => {
            warn!("Config hot-reload unavailable: {:#}", e);
            (None, AppConfig::load_or_default(&paths.config).await?)
        }
    };

    let backend: Arc<dyn VolumeBackend> = if args.simulate {
        Arc::new(SimulatedBackend::new(UNKNOWN_BASELINE))
    } else {
        config.backend.build()
    };
    info!("Mixer backend: {}", backend.name());

    let (broadcaster, outbound) = FeedbackBroadcaster::channel();
    let engine = VolumeActor::spawn(backend, config.engine.timings(), broadcaster);

    let session = {
        let engine = engine.clone();
        async move {
            if args.console {
                run_console(engine, outbound).await
            } else if let (Some(port), Some(uuid), Some(event)) =
                (args.port, args.plugin_uuid, args.register_event)
            {
                HostConnection::new(port, uuid, event).run(engine, outbound).await
            } else {
                anyhow::bail!("Nothing to do: pass -port/-pluginUUID/-registerEvent or --console")
            }
        }
    };

    let result = run_app(
        engine.clone(),
        config,
        session,
        config_watcher,
        shutdown_signal(),
    )
    .await;

    engine.shutdown();
    info!("Volume Dial shutdown complete");
    result
}

async fn run_app(
    engine: VolumeActorHandle,
    mut config: AppConfig,
    session: impl Future<Output = Result<()>>,
    mut config_watcher: Option<ConfigWatcher>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(session);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut session => {
                info!("Session ended");
                return result;
            }

            Some(new_config) = next_config(&mut config_watcher) => {
                info!("📝 Configuration file changed, applying engine timings");
                if new_config.engine != config.engine {
                    engine.update_timings(new_config.engine.timings());
                }
                if new_config.backend != config.backend {
                    warn!("⚠️  Backend changes take effect on restart");
                }
                config = new_config;
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping");
                return Ok(());
            }
        }
    }
}

async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

fn init_logging(level: &str, logs_dir: &Path) -> Result<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::daily(logs_dir, "volume-dial.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
