//! EventServer: accepts TCP clients and fans input events out to them.
//!
//! The server is driven by the display loop, one [`EventServer::tick`] per
//! frame.  Each tick runs three phases:
//!
//! 1. **Accept**: drain every pending connection from the listener without
//!    waiting.  The listener is polled once per attempt and the phase ends
//!    as soon as it reports nothing ready, so an idle listener costs no time.
//! 2. **Broadcast**: encode the tick's events once, then write them to every
//!    client in order.  Each write is bounded by the configured I/O timeout.
//!    The first failed write marks the client and skips the rest of its
//!    writes for this tick.
//! 3. **Prune**: close and remove every marked client, logging each one
//!    exactly once.
//!
//! A client that fails therefore never affects the others, and a slow client
//! stalls the tick by at most one I/O timeout.

use std::future::poll_fn;
use std::net::SocketAddr;
use std::task::Poll;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tilecast_core::protocol::{encode_event_now, SequenceCounter};
use tilecast_core::InputEvent;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::infrastructure::storage::EventServerSettings;

/// Error type for server start-up.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Error type for a single client write.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

/// Destination for one client's encoded events.
#[async_trait]
pub trait EventSink: Send {
    /// Writes one encoded record.
    async fn send(&mut self, record: &[u8]) -> Result<(), SendError>;

    /// Closes the underlying connection.  Called once when the client is
    /// pruned or the server shuts down.
    async fn close(&mut self) {}
}

/// [`EventSink`] over a TCP connection.
pub struct TcpEventSink {
    stream: TcpStream,
    io_timeout: Duration,
}

impl TcpEventSink {
    pub fn new(stream: TcpStream, io_timeout: Duration) -> Self {
        Self { stream, io_timeout }
    }
}

#[async_trait]
impl EventSink for TcpEventSink {
    async fn send(&mut self, record: &[u8]) -> Result<(), SendError> {
        match timeout(self.io_timeout, self.stream.write_all(record)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SendError::Timeout(self.io_timeout)),
        }
    }

    async fn close(&mut self) {
        // The peer may already be gone; nothing useful to do on failure.
        let _ = self.stream.shutdown().await;
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

struct Client {
    id: Uuid,
    description: String,
    sink: Box<dyn EventSink>,
}

/// What one [`EventServer::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerTick {
    pub accepted: usize,
    pub dropped: usize,
    /// Events encoded and offered to the clients.
    pub sent_events: usize,
}

/// Multi-client input event broadcaster.
pub struct EventServer {
    listener: Option<TcpListener>,
    clients: Vec<Client>,
    io_timeout: Duration,
    sequence: SequenceCounter,
}

impl EventServer {
    /// Binds the listener described by `settings`.  A disabled server binds
    /// nothing and every tick is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::BindFailed`] if the address cannot be bound.
    pub async fn bind(settings: &EventServerSettings) -> Result<Self, ServerError> {
        let io_timeout = Duration::from_millis(settings.io_timeout_ms);
        if !settings.enabled {
            info!("event server disabled by configuration");
            return Ok(Self::with_listener(None, io_timeout));
        }

        let addr = format!("{}:{}", settings.bind, settings.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::BindFailed {
                addr: addr.clone(),
                source,
            })?;
        match listener.local_addr() {
            Ok(local) => info!("event server listening on {local}"),
            Err(_) => info!("event server listening on {addr}"),
        }
        Ok(Self::with_listener(Some(listener), io_timeout))
    }

    /// A server with no listener.  Clients can still be attached by hand.
    pub fn disabled(io_timeout: Duration) -> Self {
        Self::with_listener(None, io_timeout)
    }

    fn with_listener(listener: Option<TcpListener>, io_timeout: Duration) -> Self {
        Self {
            listener,
            clients: Vec::new(),
            io_timeout,
            sequence: SequenceCounter::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.listener.is_some()
    }

    /// Address the listener is bound to, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// `address:port` of every client, in connection order.
    pub fn client_descriptions(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.description.clone()).collect()
    }

    /// Adds a client with an arbitrary sink and returns its session id.
    pub fn attach_client(&mut self, description: impl Into<String>, sink: Box<dyn EventSink>) -> Uuid {
        let id = Uuid::new_v4();
        let description = description.into();
        debug!(session = %id, "attached client {description}");
        self.clients.push(Client { id, description, sink });
        id
    }

    /// Accepts every pending connection.  Returns how many were accepted.
    pub async fn accept_pending(&mut self) -> usize {
        let Some(listener) = self.listener.as_ref() else {
            return 0;
        };

        let mut accepted = Vec::new();
        loop {
            let ready = poll_fn(|cx| match listener.poll_accept(cx) {
                Poll::Ready(result) => Poll::Ready(Some(result)),
                Poll::Pending => Poll::Ready(None),
            })
            .await;
            match ready {
                Some(Ok((stream, peer_addr))) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("set_nodelay failed for {peer_addr}: {e}");
                    }
                    accepted.push((peer_addr, stream));
                }
                Some(Err(e)) => {
                    // Transient accept error (e.g. the peer reset before we
                    // got to it).  Try again next tick.
                    error!("accept error: {e}");
                    break;
                }
                None => break,
            }
        }

        let count = accepted.len();
        for (peer_addr, stream) in accepted {
            let sink = TcpEventSink::new(stream, self.io_timeout);
            let id = self.attach_client(peer_addr.to_string(), Box::new(sink));
            info!(session = %id, "new connection from {peer_addr}");
        }
        count
    }

    /// Writes `events` to every client, then prunes the clients whose writes
    /// failed.  Returns the number of clients dropped.
    pub async fn broadcast(&mut self, events: &[InputEvent]) -> usize {
        if events.is_empty() || self.clients.is_empty() {
            return 0;
        }

        let mut records = Vec::with_capacity(events.len());
        for event in events {
            match encode_event_now(event, self.sequence.next()) {
                Ok(bytes) => records.push(bytes),
                Err(e) => warn!("skipping unencodable event {}: {e}", event.name()),
            }
        }

        let mut failed: Vec<Uuid> = Vec::new();
        for client in &mut self.clients {
            for record in &records {
                if let Err(e) = client.sink.send(record).await {
                    debug!(session = %client.id, "send to {} failed: {e}", client.description);
                    failed.push(client.id);
                    break;
                }
            }
        }

        self.prune(&failed).await
    }

    async fn prune(&mut self, failed: &[Uuid]) -> usize {
        if failed.is_empty() {
            return 0;
        }
        let (dropped, kept): (Vec<Client>, Vec<Client>) = std::mem::take(&mut self.clients)
            .into_iter()
            .partition(|c| failed.contains(&c.id));
        self.clients = kept;

        let count = dropped.len();
        for mut client in dropped {
            client.sink.close().await;
            warn!(session = %client.id, "dropped connection from {}", client.description);
        }
        count
    }

    /// One server tick: accept, broadcast, prune.  Without a listener and
    /// without hand-attached clients this does nothing.
    pub async fn tick(&mut self, events: &[InputEvent]) -> ServerTick {
        let accepted = self.accept_pending().await;
        let offered = if self.clients.is_empty() { 0 } else { events.len() };
        let dropped = self.broadcast(events).await;
        ServerTick {
            accepted,
            dropped,
            sent_events: offered,
        }
    }

    /// Closes every client and drops the listener.
    pub async fn shutdown(&mut self) {
        for client in &mut self.clients {
            client.sink.close().await;
        }
        if !self.clients.is_empty() {
            info!("closed {} event client(s)", self.clients.len());
        }
        self.clients.clear();
        self.listener = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tilecast_core::protocol::EventStreamDecoder;
    use tilecast_core::{Key, MouseButton};

    use super::*;

    /// Records every write; fails the write numbered `fail_at` (1-based).
    struct RecordingSink {
        written: Arc<Mutex<Vec<u8>>>,
        closed: Arc<Mutex<u32>>,
        writes: usize,
        fail_at: Option<usize>,
    }

    fn recording_sink(fail_at: Option<usize>) -> (RecordingSink, Arc<Mutex<Vec<u8>>>, Arc<Mutex<u32>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(0));
        let sink = RecordingSink {
            written: Arc::clone(&written),
            closed: Arc::clone(&closed),
            writes: 0,
            fail_at,
        };
        (sink, written, closed)
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn send(&mut self, record: &[u8]) -> Result<(), SendError> {
            self.writes += 1;
            if self.fail_at == Some(self.writes) {
                return Err(SendError::Timeout(Duration::from_millis(500)));
            }
            self.written.lock().unwrap().extend_from_slice(record);
            Ok(())
        }

        async fn close(&mut self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    fn decoded_names(bytes: &[u8]) -> Vec<String> {
        let mut decoder = EventStreamDecoder::new();
        decoder.extend(bytes);
        decoder
            .drain_records()
            .unwrap()
            .into_iter()
            .map(|r| r.event.name())
            .collect()
    }

    #[tokio::test]
    async fn test_disabled_server_tick_is_noop() {
        // Arrange
        let mut server = EventServer::disabled(Duration::from_millis(500));

        // Act
        let tick = server.tick(&[InputEvent::key_down(Key::A)]).await;

        // Assert
        assert_eq!(tick, ServerTick::default());
        assert!(!server.is_enabled());
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn test_failed_client_is_pruned_once_and_others_keep_receiving() {
        // Arrange
        let mut server = EventServer::disabled(Duration::from_millis(500));
        let (a, a_bytes, _) = recording_sink(None);
        let (b, _, b_closed) = recording_sink(Some(2));
        let (c, c_bytes, _) = recording_sink(None);
        server.attach_client("10.0.0.1:5000", Box::new(a));
        server.attach_client("10.0.0.2:5000", Box::new(b));
        server.attach_client("10.0.0.3:5000", Box::new(c));
        let events = [
            InputEvent::key_down(Key::A),
            InputEvent::pointer_move(3.0, 4.0),
            InputEvent::button_down(MouseButton::Left, 3.0, 4.0),
        ];

        // Act
        let dropped = server.broadcast(&events).await;
        let dropped_again = server.broadcast(&[InputEvent::key_up(Key::A)]).await;

        // Assert
        assert_eq!(dropped, 1);
        assert_eq!(dropped_again, 0);
        assert_eq!(*b_closed.lock().unwrap(), 1);
        assert_eq!(server.client_descriptions(), vec!["10.0.0.1:5000", "10.0.0.3:5000"]);
        let expected = vec!["Keyboard/A/Down", "Mouse/Position", "Mouse/Left DOWN", "Keyboard/A/Up"];
        assert_eq!(decoded_names(&a_bytes.lock().unwrap()), expected);
        assert_eq!(decoded_names(&c_bytes.lock().unwrap()), expected);
    }

    #[tokio::test]
    async fn test_sequence_numbers_are_monotonic_across_broadcasts() {
        let mut server = EventServer::disabled(Duration::from_millis(500));
        let (sink, bytes, _) = recording_sink(None);
        server.attach_client("peer", Box::new(sink));

        server.broadcast(&[InputEvent::key_down(Key::B)]).await;
        server.broadcast(&[InputEvent::key_up(Key::B), InputEvent::key_down(Key::C)]).await;

        let mut decoder = EventStreamDecoder::new();
        decoder.extend(&bytes.lock().unwrap());
        let sequence: Vec<u64> = decoder
            .drain_records()
            .unwrap()
            .iter()
            .map(|r| r.header.sequence_number)
            .collect();
        assert_eq!(sequence, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_shutdown_closes_every_client() {
        let mut server = EventServer::disabled(Duration::from_millis(500));
        let (sink, _, closed) = recording_sink(None);
        server.attach_client("peer", Box::new(sink));

        server.shutdown().await;

        assert_eq!(server.client_count(), 0);
        assert_eq!(*closed.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bind_failure_reports_address() {
        // Arrange: occupy a port first.
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let settings = EventServerSettings {
            enabled: true,
            bind: "127.0.0.1".to_string(),
            port,
            io_timeout_ms: 500,
        };

        // Act
        let result = EventServer::bind(&settings).await;

        // Assert
        match result {
            Err(ServerError::BindFailed { addr, .. }) => assert_eq!(addr, format!("127.0.0.1:{port}")),
            Ok(_) => panic!("expected bind failure"),
        }
    }
}
