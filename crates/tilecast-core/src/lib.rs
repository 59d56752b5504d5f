//! # tilecast-core
//!
//! Shared library for Tilecast containing the domain value types, the table
//! of tracked keys, and the input-event wire protocol.
//!
//! This crate is used by both the display application and the event monitor.
//! It has zero dependencies on graphics APIs, window systems, or sockets.
//!
//! # Architecture overview (for beginners)
//!
//! Tilecast shows live video from external producers in one or more screen
//! regions ("tiles") and, at the same time, forwards the local keyboard and
//! mouse to any number of remote listeners over TCP.
//!
//! This crate (`tilecast-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Plain value types used everywhere: which eye a view
//!   belongs to, viewport rectangles, output sizes, accelerator identities,
//!   pixel formats, and the [`EdgeDetector`] that turns a sampled boolean
//!   into rising/falling edges.
//!
//! - **`keymap`** – The fixed table of keys whose transitions are reported,
//!   together with their wire names (`"A"`, `"LeftArrow"`, ...).
//!
//! - **`protocol`** – How input events travel over the network.  Events are
//!   encoded into a compact binary record (24-byte header + payload) and
//!   decoded back on the other end, one record at a time or from a byte
//!   stream.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::edge::{Edge, EdgeDetector};
pub use domain::geometry::{AcceleratorId, Eye, PixelFormat, Rect, Size};
pub use keymap::{Key, MouseButton, TRACKED_KEYS};
pub use protocol::codec::{decode_event, encode_event, ProtocolError};
pub use protocol::messages::{EventKind, InputEvent};
