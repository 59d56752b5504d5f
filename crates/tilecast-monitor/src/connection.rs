//! TCP connection to an event server, with automatic reconnect.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tilecast_core::protocol::{EventRecord, EventStreamDecoder};
use tilecast_core::{InputEvent, ProtocolError};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{self, timeout};
use tracing::{debug, info, warn};

/// How long one read waits before re-checking the shutdown flag.
const READ_POLL_WAIT: Duration = Duration::from_millis(200);

const READ_BUFFER_SIZE: usize = 4096;

/// Errors that end one monitoring session.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The server sent bytes that are not a valid record stream.
    #[error("invalid event stream: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Where to connect and how long to wait between attempts.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// `host:port` of the event server.
    pub server_addr: String,
    pub reconnect_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:9030".to_string(),
            reconnect_interval: Duration::from_secs(2),
        }
    }
}

/// Event-server client.
pub struct EventMonitor {
    config: MonitorConfig,
}

impl EventMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Connects once and hands every decoded record to `on_record` until
    /// the server closes the connection or `running` is cleared.  Returns
    /// the number of records received.
    ///
    /// # Errors
    ///
    /// Connect failures, read errors and malformed streams.
    pub async fn run_session<F>(&self, running: &AtomicBool, on_record: &mut F) -> Result<u64, MonitorError>
    where
        F: FnMut(&EventRecord),
    {
        let addr = self.config.server_addr.as_str();
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|source| MonitorError::ConnectFailed {
                addr: addr.to_string(),
                source,
            })?;
        info!("connected to event server at {addr}");

        let mut decoder = EventStreamDecoder::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut received = 0u64;

        while running.load(Ordering::Relaxed) {
            let n = match timeout(READ_POLL_WAIT, stream.read(&mut buf)).await {
                Ok(result) => result?,
                Err(_) => continue,
            };
            if n == 0 {
                if decoder.buffered_len() > 0 {
                    debug!(bytes = decoder.buffered_len(), "discarding partial record at end of stream");
                }
                break;
            }
            decoder.extend(&buf[..n]);
            while let Some(record) = decoder.next_record()? {
                received += 1;
                on_record(&record);
            }
        }
        Ok(received)
    }

    /// Runs sessions back to back until `running` is cleared, waiting
    /// [`MonitorConfig::reconnect_interval`] between them.
    pub async fn run<F>(&self, running: Arc<AtomicBool>, mut on_record: F)
    where
        F: FnMut(&EventRecord),
    {
        while running.load(Ordering::Relaxed) {
            match self.run_session(&running, &mut on_record).await {
                Ok(count) => info!(
                    events = count,
                    "event server closed the connection; reconnecting in {:?}", self.config.reconnect_interval
                ),
                Err(e) => warn!("{e}"),
            }

            if running.load(Ordering::Relaxed) {
                time::sleep(self.config.reconnect_interval).await;
            }
        }
    }
}

/// One-line description of an event: its name plus any numeric fields.
///
/// `Keyboard/A/Down`, `Mouse/Position (120, 45)`.
pub fn describe_event(event: &InputEvent) -> String {
    if event.fields.is_empty() {
        return event.name();
    }
    let fields = event
        .fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} ({fields})", event.name())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
