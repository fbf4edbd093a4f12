//! Fire Macro Runner
//!
//! Macro pad for the Akai Fire and other MIDI controllers.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fire_macro_runner::color::SurfaceProfile;
use fire_macro_runner::config::{ConfigStore, ConfigWatcher};
use fire_macro_runner::device::{self, DeviceRecord};
use fire_macro_runner::executor::ActionExecutor;
use fire_macro_runner::fire::FireSurface;
use fire_macro_runner::paths::{AppPaths, FALLBACK_MACROS, PRIMARY_MACROS};
use fire_macro_runner::{cli, DispatchEngine, DispatchOutcome};

/// Fire Macro Runner - turn a MIDI pad controller into a macro keyboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the macro and device files
    #[arg(long, env = "FIRE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Macro file to load instead of the default one
    #[arg(short, long)]
    config: Option<String>,

    /// MIDI device name (substring match); remembered for next time
    #[arg(short, long)]
    device: Option<String>,

    /// Controller without Fire LEDs: no illumination is sent
    #[arg(long)]
    generic: bool,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Do not reload the macro file when it changes on disk
    #[arg(long)]
    no_watch: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let paths = AppPaths::detect(args.config_dir.as_deref());
    let logs_dir = match paths.ensure_directories() {
        Ok(()) => Some(paths.logs_dir.clone()),
        Err(e) => {
            eprintln!("[paths] {:#}, logging to console only", e);
            None
        }
    };
    let _log_guard = init_logging(&args.log_level, logs_dir)?;

    info!("Starting Fire Macro Runner v{}...", env!("CARGO_PKG_VERSION"));
    info!("Config directory: {}", paths.config_dir.display());

    if args.list_ports {
        device::print_ports();
        return Ok(());
    }

    let device_name = choose_device(&args, &paths).await?;
    let profile = if args.generic {
        SurfaceProfile::Generic
    } else {
        SurfaceProfile::Fire
    };

    let mut surface = FireSurface::new(device_name.clone(), profile);
    surface
        .connect()
        .with_context(|| format!("Could not open MIDI device '{}'", device_name))?;
    let mut events = surface
        .take_event_receiver()
        .context("Surface event receiver already taken")?;

    let store = ConfigStore::new(&paths.config_dir, PRIMARY_MACROS, FALLBACK_MACROS);
    let engine = DispatchEngine::start(
        store,
        ActionExecutor::system(),
        Arc::new(surface),
        args.config.as_deref(),
    )
    .await
    .context("No usable macro configuration")?;

    let mut watcher = if args.no_watch {
        None
    } else {
        match ConfigWatcher::new(&paths.config_dir) {
            Ok(watcher) => {
                info!("Watching {} for changes", paths.config_dir.display());
                Some(watcher)
            }
            Err(e) => {
                warn!("Live reload disabled: {:#}", e);
                None
            }
        }
    };
    watch_active_dir(&mut watcher, &engine);

    println!("Listening on '{}'. Press Ctrl+C to exit.", device_name);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("Surface event stream closed");
                    break;
                };
                let outcome = engine.dispatch(event).await;
                debug!("Dispatch outcome: {:?}", outcome);
                if matches!(outcome, DispatchOutcome::Switched { .. }) {
                    watch_active_dir(&mut watcher, &engine);
                }
            }

            Some(path) = next_change(&mut watcher) => {
                let mut changed = vec![path];
                if let Some(watcher) = watcher.as_mut() {
                    changed.extend(watcher.drain_pending());
                }
                if engine.touches_active_file(&changed) {
                    info!("{} changed, reloading...", engine.active_path().display());
                    if let Err(e) = engine.reload_active().await {
                        warn!("{}", e);
                    }
                }
            }

            _ = &mut shutdown => {
                break;
            }
        }
    }

    println!("Exiting cleanly...");
    info!("Fire Macro Runner shutdown complete");
    Ok(())
}

/// Resolve the device to open: flag, remembered record, or interactive prompt
async fn choose_device(args: &Args, paths: &AppPaths) -> Result<String> {
    if let Some(name) = &args.device {
        remember_device(paths, name).await;
        return Ok(name.clone());
    }

    let inputs = device::list_input_ports().context("Failed to enumerate MIDI inputs")?;

    let record = DeviceRecord::load(&paths.device_file).await;
    if let Some(name) = record.device_name {
        if inputs.iter().any(|port| device::port_matches(port, &name)) {
            info!("Using saved device '{}'", name);
            return Ok(name);
        }
        warn!("Saved device '{}' is not connected", name);
    }

    let chosen = tokio::task::spawn_blocking(move || cli::select_device(&inputs))
        .await
        .context("Device prompt panicked")??;
    let Some(name) = chosen else {
        bail!("No MIDI device selected");
    };

    remember_device(paths, &name).await;
    Ok(name)
}

async fn remember_device(paths: &AppPaths, name: &str) {
    let record = DeviceRecord {
        device_name: Some(name.to_string()),
    };
    if let Err(e) = record.save(&paths.device_file).await {
        warn!("Could not remember device: {:#}", e);
    }
}

/// Macro files loaded from outside the config directory get their folder watched too
fn watch_active_dir(watcher: &mut Option<ConfigWatcher>, engine: &DispatchEngine) {
    let Some(watcher) = watcher.as_mut() else {
        return;
    };
    let active = engine.active_path();
    if let Some(dir) = active.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Err(e) = watcher.ensure_watching(dir) {
            warn!("Edits to {} will not be picked up: {:#}", active.display(), e);
        }
    }
}

async fn next_change(watcher: &mut Option<ConfigWatcher>) -> Option<PathBuf> {
    match watcher {
        Some(watcher) => watcher.next_change().await,
        None => std::future::pending().await,
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}

fn init_logging(level: &str, logs_dir: Option<PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match logs_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fire-macro-runner.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
