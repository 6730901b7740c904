// LogRelay - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation
// 3. Process-scoped resources: tail monitor, change watcher, event writer
// 4. The line-delimited JSON control loop on stdin/stdout
//
// Each stdin line is one control message; each stdout line is one JSON
// message (tail topic events and direct query replies). Logs go to stderr.
// EOF on stdin shuts the service down, releasing the watch subscription and
// its thread exactly once.

use clap::Parser;
use logrelay::app::broadcast::ChannelBroadcaster;
use logrelay::app::control::ControlPlane;
use logrelay::app::monitor::TailMonitor;
use logrelay::app::query::{QueryService, QuerySettings};
use logrelay::app::watcher::ChangeWatcher;
use logrelay::platform::config::{self, PlatformPaths};
use logrelay::util;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// LogRelay - query and live-tail a directory of log files.
///
/// Reads JSON control messages (start-monitoring, stop-monitoring, query)
/// from stdin and writes JSON events and replies to stdout.
#[derive(Parser, Debug)]
#[command(name = "logrelay", version, about)]
struct Cli {
    /// Log root directory (overrides [logs] path in config.toml).
    #[arg(short = 'l', long = "log-dir")]
    log_dir: Option<PathBuf>,

    /// Path to config.toml (defaults to the platform config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

/// Write one value as a JSON line on stdout. The stdout lock keeps lines
/// from the writer thread and the control loop from interleaving.
fn write_json_line<T: Serialize>(value: &T) {
    let text = match serde_json::to_string(value) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialise outbound message");
            return;
        }
    };
    let mut out = io::stdout().lock();
    if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
        tracing::warn!(error = %e, "Failed to write outbound message");
    }
}

fn main() {
    let cli = Cli::parse();

    // Config is read before logging so its [logging] section applies;
    // validation warnings are replayed once the subscriber exists.
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file());
    let (mut app_config, config_warnings) = config::load_config(&config_path);

    util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Configuration warning");
    }

    if let Some(dir) = cli.log_dir {
        app_config.log_path = dir;
    }

    tracing::info!(
        version = util::constants::APP_VERSION,
        root = %app_config.log_path.display(),
        security = app_config.enable_security,
        "LogRelay starting"
    );

    let broadcaster = Arc::new(ChannelBroadcaster::new());
    let events = broadcaster.subscribe();

    let monitor = Arc::new(TailMonitor::new(
        app_config.log_path.clone(),
        app_config.enable_security,
        broadcaster.clone(),
    ));

    // Monitoring is optional: without a subscription queries still work.
    let mut watcher = match ChangeWatcher::spawn(&app_config.log_path, Arc::clone(&monitor)) {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::error!(error = %e, "Live tailing unavailable for this run");
            None
        }
    };

    let writer = match std::thread::Builder::new()
        .name("logrelay-out".to_string())
        .spawn(move || {
            for event in events {
                write_json_line(&event);
            }
        }) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to spawn output thread");
            eprintln!("Error: failed to start LogRelay output thread: {e}");
            std::process::exit(1);
        }
    };

    let plane = ControlPlane::new(monitor, QueryService::new(QuerySettings::from(&app_config)));

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read control input; shutting down");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Some(reply) = plane.handle_json(&line).to_json() {
            write_json_line(&reply);
        }
    }

    tracing::info!("Control input closed, shutting down");

    if let Some(mut w) = watcher.take() {
        w.shutdown();
    }
    // Last owners of the broadcaster: the writer's channel closes after this.
    drop(plane);
    drop(broadcaster);

    if writer.join().is_err() {
        tracing::error!("Output thread panicked");
    }
}
