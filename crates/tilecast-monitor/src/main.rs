//! Tilecast event monitor entry point.
//!
//! ```text
//! tilecast-monitor [--host 127.0.0.1] [--port 9030] [--reconnect-secs 2]
//! ```
//!
//! Every received event is logged at `info` level with its sequence number.
//! Set `RUST_LOG=debug` for connection details.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tilecast_monitor::{describe_event, EventMonitor, MonitorConfig};

/// Connects to a Tilecast display's event server and logs every input event.
#[derive(Debug, Parser)]
#[command(name = "tilecast-monitor", version)]
struct Cli {
    /// Event server host.
    #[arg(long, default_value = "127.0.0.1", env = "TILECAST_MONITOR_HOST")]
    host: String,

    /// Event server port.
    #[arg(long, default_value_t = 9030, env = "TILECAST_MONITOR_PORT")]
    port: u16,

    /// Seconds to wait before reconnecting after the server goes away.
    #[arg(long, default_value_t = 2, env = "TILECAST_MONITOR_RECONNECT_SECS")]
    reconnect_secs: u64,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info", env = "TILECAST_MONITOR_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let config = MonitorConfig {
        server_addr: format!("{}:{}", cli.host, cli.port),
        reconnect_interval: Duration::from_secs(cli.reconnect_secs),
    };
    info!("tilecast monitor starting; server {}", config.server_addr);

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    EventMonitor::new(config)
        .run(running, |record| {
            info!(
                seq = record.header.sequence_number,
                ts_us = record.header.timestamp_us,
                "{}",
                describe_event(&record.event)
            );
        })
        .await;

    info!("tilecast monitor stopped");
    Ok(())
}
