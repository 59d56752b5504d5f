//! In-process video transport.
//!
//! Producers are keyed by channel name.  Each call to
//! [`LoopbackVideoHub::push_frame`] publishes a new frame; receivers see it
//! as new exactly once.  Stopping a producer makes every receiver on that
//! channel poll `None` until it is published again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tilecast_core::{AcceleratorId, Eye, PixelFormat};
use tracing::debug;

use super::{VideoError, VideoFrame, VideoSource, VideoSourceFactory};

#[derive(Debug, Clone)]
struct Producer {
    format: PixelFormat,
    accelerator: AcceleratorId,
    /// Bumped on every published frame; doubles as the shared handle.
    frame: u64,
}

#[derive(Debug, Default)]
struct HubState {
    producers: HashMap<String, Producer>,
    refuse_connect: HashMap<String, String>,
    next_frame: u64,
    opened: u32,
    connects: u32,
    disconnects: u32,
}

impl HubState {
    fn next_frame(&mut self) -> u64 {
        self.next_frame += 1;
        self.next_frame
    }
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared in-process transport.  Clones share the same producers.
#[derive(Debug, Clone, Default)]
pub struct LoopbackVideoHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackVideoHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a producer on `channel` and publishes its first
    /// frame.
    pub fn publish(&self, channel: &str, format: PixelFormat, accelerator: AcceleratorId) {
        let mut state = lock(&self.state);
        let frame = state.next_frame();
        state.producers.insert(
            channel.to_string(),
            Producer {
                format,
                accelerator,
                frame,
            },
        );
    }

    /// Publishes a new frame on a running producer.  No-op if the channel has
    /// no producer.
    pub fn push_frame(&self, channel: &str) {
        let mut state = lock(&self.state);
        let frame = state.next_frame();
        if let Some(producer) = state.producers.get_mut(channel) {
            producer.frame = frame;
        }
    }

    /// Moves a running producer to another accelerator.
    pub fn move_to_accelerator(&self, channel: &str, accelerator: AcceleratorId) {
        if let Some(producer) = lock(&self.state).producers.get_mut(channel) {
            producer.accelerator = accelerator;
        }
    }

    /// Stops the producer on `channel`.
    pub fn stop(&self, channel: &str) {
        lock(&self.state).producers.remove(channel);
    }

    /// The next receiver connect on `channel` fails with `reason`.
    pub fn refuse_next_connect(&self, channel: &str, reason: &str) {
        lock(&self.state)
            .refuse_connect
            .insert(channel.to_string(), reason.to_string());
    }

    /// Receivers opened so far.
    pub fn opened(&self) -> u32 {
        lock(&self.state).opened
    }

    /// Successful receiver connects so far.
    pub fn connects(&self) -> u32 {
        lock(&self.state).connects
    }

    /// Receiver disconnects so far.
    pub fn disconnects(&self) -> u32 {
        lock(&self.state).disconnects
    }
}

impl VideoSourceFactory for LoopbackVideoHub {
    fn open(&self, channel: &str, eye: Eye) -> Box<dyn VideoSource> {
        lock(&self.state).opened += 1;
        debug!(channel, %eye, "opened loopback receiver");
        Box::new(LoopbackSource {
            state: Arc::clone(&self.state),
            channel: channel.to_string(),
            connected: false,
            last_frame: None,
        })
    }
}

/// Receiver for one loopback channel.
pub struct LoopbackSource {
    state: Arc<Mutex<HubState>>,
    channel: String,
    connected: bool,
    last_frame: Option<u64>,
}

impl VideoSource for LoopbackSource {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn connect(&mut self, _accelerator: AcceleratorId) -> Result<(), VideoError> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.refuse_connect.remove(&self.channel) {
            return Err(VideoError::ConnectFailed {
                channel: self.channel.clone(),
                reason,
            });
        }
        state.connects += 1;
        self.connected = true;
        self.last_frame = None;
        Ok(())
    }

    fn poll(&mut self) -> Option<VideoFrame> {
        if !self.connected {
            return None;
        }
        let state = lock(&self.state);
        let Some(producer) = state.producers.get(&self.channel) else {
            self.last_frame = None;
            return None;
        };
        let is_new = self.last_frame != Some(producer.frame);
        self.last_frame = Some(producer.frame);
        Some(VideoFrame {
            shared_handle: producer.frame,
            format: producer.format,
            accelerator: producer.accelerator,
            is_new,
        })
    }

    fn disconnect(&mut self) {
        if std::mem::take(&mut self.connected) {
            lock(&self.state).disconnects += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPU: AcceleratorId = AcceleratorId(1);

    fn connected_source(hub: &LoopbackVideoHub, channel: &str) -> Box<dyn VideoSource> {
        let mut source = hub.open(channel, Eye::Mono);
        source.connect(GPU).expect("connect");
        source
    }

    #[test]
    fn test_poll_without_producer_returns_none() {
        // Arrange
        let hub = LoopbackVideoHub::new();
        let mut source = connected_source(&hub, "cam");

        // Act / Assert
        assert_eq!(source.poll(), None);
    }

    #[test]
    fn test_same_frame_is_new_only_once() {
        // Arrange
        let hub = LoopbackVideoHub::new();
        hub.publish("cam", PixelFormat::Bgra8Unorm, GPU);
        let mut source = connected_source(&hub, "cam");

        // Act
        let first = source.poll().expect("frame");
        let second = source.poll().expect("frame");
        hub.push_frame("cam");
        let third = source.poll().expect("frame");

        // Assert
        assert!(first.is_new);
        assert!(!second.is_new);
        assert!(third.is_new);
        assert_ne!(first.shared_handle, third.shared_handle);
    }

    #[test]
    fn test_stopped_producer_polls_none() {
        let hub = LoopbackVideoHub::new();
        hub.publish("cam", PixelFormat::Rgba8Unorm, GPU);
        let mut source = connected_source(&hub, "cam");
        assert!(source.poll().is_some());

        hub.stop("cam");

        assert_eq!(source.poll(), None);
    }

    #[test]
    fn test_unconnected_source_polls_none() {
        let hub = LoopbackVideoHub::new();
        hub.publish("cam", PixelFormat::Rgba8Unorm, GPU);
        let mut source = hub.open("cam", Eye::Left);
        assert_eq!(source.poll(), None);
    }

    #[test]
    fn test_refused_connect_reports_channel() {
        let hub = LoopbackVideoHub::new();
        hub.refuse_next_connect("cam", "busy");
        let mut source = hub.open("cam", Eye::Left);

        let err = source.connect(GPU).unwrap_err();

        assert_eq!(
            err,
            VideoError::ConnectFailed {
                channel: "cam".to_string(),
                reason: "busy".to_string()
            }
        );
    }

    #[test]
    fn test_open_keeps_channel_name() {
        let hub = LoopbackVideoHub::new();
        let source = hub.open("Main_LeftEye", Eye::Left);
        assert_eq!(source.channel(), "Main_LeftEye");
        assert_eq!(hub.opened(), 1);
    }

    #[test]
    fn test_disconnect_is_counted_once() {
        let hub = LoopbackVideoHub::new();
        let mut source = connected_source(&hub, "cam");

        source.disconnect();
        source.disconnect();

        assert_eq!(hub.disconnects(), 1);
    }
}
