//! Tilecast display: entry point.
//!
//! Loads configuration, starts the event server, brings up the graphics
//! device and runs the tick loop until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! tilecast-display [-f FILE]... [-c KEY=VALUE]...
//!
//! Options:
//!   -f, --file <FILE>          Config file to merge (repeatable, in order)
//!   -c, --config <KEY=VALUE>   Override one key after all files (repeatable)
//!   -h, --help                 Print help
//! ```
//!
//! This build links the in-process backends: the headless graphics device,
//! the loopback video hub and a scripted window.  Producers publishing into
//! the hub from the same process show up in the tiles; everything else
//! (configuration, device lifecycle, event server) behaves exactly as with a
//! hardware backend.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use tilecast_core::AcceleratorId;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tilecast_display::application::compositor::Compositor;
use tilecast_display::application::run_display::{DisplayApp, TickResult};
use tilecast_display::infrastructure::graphics::headless::HeadlessBackend;
use tilecast_display::infrastructure::network::EventServer;
use tilecast_display::infrastructure::storage::{split_override, ConfigStore, DisplaySettings};
use tilecast_display::infrastructure::video::loopback::LoopbackVideoHub;
use tilecast_display::infrastructure::window::scripted::ScriptedWindow;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Tiled video compositor with an input-event broadcast server.
#[derive(Debug, Parser)]
#[command(name = "tilecast-display", version)]
struct Cli {
    /// TOML config file.  Repeat to merge several; later files win.
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Override a single key, e.g. `-c STEREO=true`.  Applied after all
    /// files.
    #[arg(short = 'c', long = "config", value_name = "KEY=VALUE", value_parser = split_override)]
    overrides: Vec<(String, String)>,
}

impl Cli {
    /// Merges the config files and overrides into [`DisplaySettings`].
    fn load_settings(&self) -> anyhow::Result<DisplaySettings> {
        let mut store = ConfigStore::new();
        for path in &self.files {
            store
                .load_file(path)
                .with_context(|| format!("cannot load config file {}", path.display()))?;
        }
        for (key, value) in &self.overrides {
            store.apply_override(key, value);
        }
        DisplaySettings::from_store(&store).context("invalid configuration")
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and count as success.
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tilecast-display: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.load_settings()?;

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    info!("tilecast display starting");
    match toml::to_string(&settings) {
        Ok(text) => debug!("effective settings:\n{text}"),
        Err(e) => debug!("settings: {settings:?} ({e})"),
    }

    let server = EventServer::bind(&settings.event_server)
        .await
        .context("failed to start event server")?;
    let compositor = Compositor::new(
        &settings,
        Box::new(ScriptedWindow::new()),
        Box::new(LoopbackVideoHub::new()),
        server,
    );
    let mut app = DisplayApp::new(HeadlessBackend::new(AcceleratorId(0)), settings.window_size, compositor);
    app.start().context("graphics bring-up failed")?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("tilecast display ready.  Press Ctrl-C to exit.");

    let mut ticker = interval(Duration::from_millis(settings.tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        match app.tick().await {
            Ok(TickResult::Presented(report)) => {
                if report.server.accepted > 0 || report.server.dropped > 0 {
                    debug!(
                        accepted = report.server.accepted,
                        dropped = report.server.dropped,
                        clients = app.compositor().server().client_count(),
                        "event clients changed"
                    );
                }
            }
            Ok(TickResult::Resynced) => debug!("tick skipped for device rebuild"),
            Err(e) => {
                app.shutdown().await;
                return Err(e).context("graphics device could not be rebuilt");
            }
        }
    }

    app.shutdown().await;
    info!("tilecast display stopped");
    Ok(())
}
