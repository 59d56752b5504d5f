//! Network infrastructure: the input event broadcast server.

pub mod event_server;

pub use event_server::{EventServer, EventSink, SendError, ServerError, ServerTick, TcpEventSink};
