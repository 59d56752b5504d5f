//! Integration tests for the input event server: scripted sinks for the
//! pruning rules, and a real loopback TCP client for the wire format.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tilecast_core::protocol::EventStreamDecoder;
use tilecast_core::{InputEvent, Key, MouseButton};
use tilecast_display::infrastructure::network::{EventServer, EventSink, SendError, ServerTick};
use tilecast_display::infrastructure::storage::EventServerSettings;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

// ── Scripted sink ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct SinkLog {
    records: Vec<Vec<u8>>,
    closed: bool,
}

/// Records every write; optionally times out on the n-th write (1-based).
struct ScriptedSink {
    log: Arc<Mutex<SinkLog>>,
    writes: usize,
    time_out_on: Option<usize>,
}

impl ScriptedSink {
    fn new(time_out_on: Option<usize>) -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        let sink = Self {
            log: Arc::clone(&log),
            writes: 0,
            time_out_on,
        };
        (sink, log)
    }
}

#[async_trait]
impl EventSink for ScriptedSink {
    async fn send(&mut self, record: &[u8]) -> Result<(), SendError> {
        self.writes += 1;
        if self.time_out_on == Some(self.writes) {
            return Err(SendError::Timeout(Duration::from_millis(500)));
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .push(record.to_vec());
        Ok(())
    }

    async fn close(&mut self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).closed = true;
    }
}

fn decode_all(records: &[Vec<u8>]) -> Vec<(u64, String)> {
    let mut decoder = EventStreamDecoder::new();
    for record in records {
        decoder.extend(record);
    }
    decoder
        .drain_records()
        .expect("records must decode")
        .into_iter()
        .map(|r| (r.header.sequence_number, r.event.name()))
        .collect()
}

#[tokio::test]
async fn test_timed_out_client_is_dropped_and_others_keep_receiving() {
    // Arrange
    let mut server = EventServer::disabled(Duration::from_millis(500));
    let (a, log_a) = ScriptedSink::new(None);
    let (b, log_b) = ScriptedSink::new(Some(2));
    let (c, log_c) = ScriptedSink::new(None);
    server.attach_client("10.0.0.1:5000", Box::new(a));
    server.attach_client("10.0.0.2:5000", Box::new(b));
    server.attach_client("10.0.0.3:5000", Box::new(c));
    let events = [InputEvent::key_down(Key::W), InputEvent::key_down(Key::D)];

    // Act
    let first = server.tick(&events).await;
    let second = server.tick(&[InputEvent::key_up(Key::W)]).await;

    // Assert
    assert_eq!(first.dropped, 1);
    assert_eq!(first.sent_events, 2);
    assert_eq!(second.dropped, 0);
    assert_eq!(server.client_descriptions(), vec!["10.0.0.1:5000", "10.0.0.3:5000"]);

    let b = log_b.lock().unwrap_or_else(PoisonError::into_inner);
    assert_eq!(b.records.len(), 1);
    assert!(b.closed);

    for log in [&log_a, &log_c] {
        let log = log.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(!log.closed);
        assert_eq!(
            decode_all(&log.records),
            vec![
                (0, "Keyboard/W/Down".to_string()),
                (1, "Keyboard/D/Down".to_string()),
                (2, "Keyboard/W/Up".to_string()),
            ]
        );
    }
}

#[test]
fn test_disabled_server_ignores_events() {
    let mut server = EventServer::disabled(Duration::from_millis(500));

    let tick = tokio_test::block_on(server.tick(&[InputEvent::key_down(Key::A)]));

    assert!(!server.is_enabled());
    assert_eq!(tick.accepted + tick.dropped + tick.sent_events, 0);
}

#[tokio::test]
async fn test_bind_with_server_disabled_opens_no_listener() {
    // Arrange
    let settings = EventServerSettings {
        enabled: false,
        ..loopback_settings()
    };

    // Act
    let mut server = EventServer::bind(&settings)
        .await
        .expect("a disabled server never fails to bind");
    let tick = server
        .tick(&[InputEvent::key_down(Key::A), InputEvent::pointer_move(1.0, 2.0)])
        .await;

    // Assert
    assert!(!server.is_enabled());
    assert!(server.local_addr().is_none());
    assert_eq!(server.client_count(), 0);
    assert_eq!(tick, ServerTick::default());
}

// ── Loopback TCP ──────────────────────────────────────────────────────────────

fn loopback_settings() -> EventServerSettings {
    EventServerSettings {
        enabled: true,
        bind: "127.0.0.1".to_string(),
        port: 0,
        io_timeout_ms: 500,
    }
}

async fn wait_for_clients(server: &mut EventServer, expected: usize) {
    for _ in 0..200 {
        server.tick(&[]).await;
        if server.client_count() == expected {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {expected} client(s), have {}", server.client_count());
}

#[tokio::test]
async fn test_tcp_client_receives_framed_events_in_order() {
    // Arrange
    let mut server = EventServer::bind(&loopback_settings())
        .await
        .expect("loopback bind must succeed");
    let addr = server.local_addr().expect("listener address");
    let mut client = TcpStream::connect(addr).await.expect("connect");
    wait_for_clients(&mut server, 1).await;

    // Act
    let events = [
        InputEvent::pointer_move(100.0, 200.0),
        InputEvent::button_down(MouseButton::Left, 100.0, 200.0),
        InputEvent::key_down(Key::Space),
    ];
    let tick = server.tick(&events).await;

    let mut decoder = EventStreamDecoder::new();
    let mut received = Vec::new();
    let mut buf = [0u8; 256];
    while received.len() < events.len() {
        let n = timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("read timed out")
            .expect("read failed");
        assert!(n > 0, "server closed the connection");
        decoder.extend(&buf[..n]);
        received.extend(decoder.drain_records().expect("valid stream"));
    }

    // Assert
    assert_eq!(tick.sent_events, 3);
    let sequence: Vec<u64> = received.iter().map(|r| r.header.sequence_number).collect();
    assert_eq!(sequence, vec![0, 1, 2]);
    let decoded: Vec<InputEvent> = received.into_iter().map(|r| r.event).collect();
    assert_eq!(decoded, events.to_vec());
}

#[tokio::test]
async fn test_disconnected_tcp_client_is_pruned() {
    // Arrange
    let mut server = EventServer::bind(&loopback_settings())
        .await
        .expect("loopback bind must succeed");
    let addr = server.local_addr().expect("listener address");
    let client = TcpStream::connect(addr).await.expect("connect");
    wait_for_clients(&mut server, 1).await;

    // Act
    drop(client);
    let mut dropped = 0;
    for _ in 0..50 {
        dropped += server.tick(&[InputEvent::key_down(Key::A)]).await.dropped;
        if server.client_count() == 0 {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }

    // Assert
    assert_eq!(dropped, 1);
    assert_eq!(server.client_count(), 0);
}

#[tokio::test]
async fn test_shutdown_closes_tcp_clients() {
    let mut server = EventServer::bind(&loopback_settings())
        .await
        .expect("loopback bind must succeed");
    let addr = server.local_addr().expect("listener address");
    let mut client = TcpStream::connect(addr).await.expect("connect");
    wait_for_clients(&mut server, 1).await;

    server.shutdown().await;

    let mut buf = [0u8; 8];
    let n = timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("read timed out")
        .unwrap_or(0);
    assert_eq!(n, 0);
    assert!(server.local_addr().is_none());
}

#[tokio::test]
async fn test_idle_listener_does_not_stall_ticks() {
    // Arrange
    let mut server = EventServer::bind(&loopback_settings())
        .await
        .expect("loopback bind must succeed");
    let addr = server.local_addr().expect("listener address");

    // Act
    let started = Instant::now();
    for _ in 0..100 {
        server.tick(&[InputEvent::key_down(Key::A)]).await;
    }
    let idle = started.elapsed();
    let _client = TcpStream::connect(addr).await.expect("connect");
    wait_for_clients(&mut server, 1).await;

    // Assert
    assert!(idle < Duration::from_millis(50), "100 idle ticks took {idle:?}");
    assert_eq!(server.client_count(), 1);
}
