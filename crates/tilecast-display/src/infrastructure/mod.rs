//! Infrastructure layer: capability traits for the outside world and their
//! in-process implementations, plus the event server and configuration.

pub mod graphics;
pub mod network;
pub mod storage;
pub mod video;
pub mod window;
