//! Protocol module containing event types, the binary codec and the stream
//! decoder.

pub mod codec;
pub mod messages;
pub mod sequence;
pub mod stream;

pub use codec::{
    decode_event, decode_header, decode_record, encode_event, encode_event_now, EventRecord,
    ProtocolError,
};
pub use messages::*;
pub use sequence::SequenceCounter;
pub use stream::EventStreamDecoder;
