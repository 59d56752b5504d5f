//! Video source capability.
//!
//! A producer process publishes frames on a named channel through some
//! texture-sharing transport.  The compositor only needs three things from
//! that transport: connect a receiver to the device's accelerator, ask for
//! the latest frame once per tick, and disconnect.
//!
//! A poll that returns `None` means "no producer right now".  That is not an
//! error: the tile shows its placeholder until a producer appears.
//!
//! # Testability
//!
//! [`loopback::LoopbackVideoHub`] is an in-process transport where tests (or
//! an embedding application) publish, advance and stop producers by channel
//! name.

use thiserror::Error;
use tilecast_core::{AcceleratorId, Eye, PixelFormat};

pub mod loopback;

/// The latest frame a producer has published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFrame {
    /// Transport-level handle of the shared texture.
    pub shared_handle: u64,
    pub format: PixelFormat,
    /// Accelerator the producer rendered the frame on.
    pub accelerator: AcceleratorId,
    /// `false` when this is the same frame the previous poll returned.
    pub is_new: bool,
}

/// Error type for video source operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VideoError {
    #[error("failed to connect receiver for channel {channel}: {reason}")]
    ConnectFailed { channel: String, reason: String },
}

/// Receiving end of one named video channel.
#[cfg_attr(test, mockall::automock)]
pub trait VideoSource {
    /// Name of the channel this receiver listens on.
    fn channel(&self) -> &str;

    /// Binds the receiver to the given accelerator.
    fn connect(&mut self, accelerator: AcceleratorId) -> Result<(), VideoError>;

    /// Returns the producer's latest frame, or `None` if no producer is
    /// publishing on this channel.
    fn poll(&mut self) -> Option<VideoFrame>;

    /// Releases the receiver.  Safe to call more than once.
    fn disconnect(&mut self);
}

/// Opens video sources by channel name.
pub trait VideoSourceFactory {
    fn open(&self, channel: &str, eye: Eye) -> Box<dyn VideoSource>;
}

impl<F> VideoSourceFactory for F
where
    F: Fn(&str, Eye) -> Box<dyn VideoSource>,
{
    fn open(&self, channel: &str, eye: Eye) -> Box<dyn VideoSource> {
        self(channel, eye)
    }
}
