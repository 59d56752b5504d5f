//! tilecast-monitor library entry point.
//!
//! The monitor is the simplest consumer of a display's event server: it
//! connects over TCP, decodes the record stream and logs every event.  It is
//! useful for checking what a display actually broadcasts and as a reference
//! client for the wire format.
//!
//! # What does it do? (for beginners)
//!
//! 1. Connect to `host:port`.
//! 2. Read whatever bytes arrive and feed them to an
//!    [`EventStreamDecoder`](tilecast_core::protocol::EventStreamDecoder),
//!    which hands back complete records.
//! 3. Pass each record to a handler (the binary logs it).
//! 4. When the server closes the connection, wait and go back to step 1.

pub mod connection;

pub use connection::{describe_event, EventMonitor, MonitorConfig, MonitorError};
