//! Application layer of the display.
//!
//! Everything here works against the capability traits in
//! [`crate::infrastructure`] and never touches an OS API directly, so every
//! use case runs unchanged against the headless device, the loopback video
//! hub and the scripted window.
//!
//! # Sub-modules
//!
//! - **`resources`** – ordered handle ownership and the lifecycle group
//!   registry.
//! - **`device_lifecycle`** – the device state machine: bring-up, loss,
//!   rebuild, resize and shutdown.
//! - **`tile`** – one screen region: video sources, placeholders, labels.
//! - **`poll_input`** – edge-triggered keyboard and mouse events.
//! - **`compositor`** – tiles, outputs, stream notifications, input and the
//!   event server, tied together per tick.
//! - **`run_display`** – the tick loop body used by the binary.

pub mod compositor;
pub mod device_lifecycle;
pub mod poll_input;
pub mod resources;
pub mod run_display;
pub mod tile;
