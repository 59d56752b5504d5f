//! Incremental decoder for a TCP byte stream of event records.
//!
//! TCP delivers bytes, not records: one `read` may return half a record or
//! several records glued together.  [`EventStreamDecoder`] buffers whatever
//! arrives and hands out complete records one at a time.

use tracing::trace;

use crate::protocol::codec::{decode_record, EventRecord, ProtocolError};

/// Buffers stream bytes and yields complete [`EventRecord`]s.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buf: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes received from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet returned as records.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next complete record, or `Ok(None)` when more bytes are
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when the buffered bytes can never form a
    /// valid record (bad version, unknown kind, malformed payload).  The
    /// stream is then unusable and the caller should drop the connection.
    pub fn next_record(&mut self) -> Result<Option<EventRecord>, ProtocolError> {
        match decode_record(&self.buf) {
            Ok((record, consumed)) => {
                self.buf.drain(..consumed);
                trace!(seq = record.header.sequence_number, consumed, "decoded event record");
                Ok(Some(record))
            }
            Err(e) if e.is_incomplete() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Drains every complete record currently buffered.
    ///
    /// # Errors
    ///
    /// See [`next_record`](Self::next_record).
    pub fn drain_records(&mut self) -> Result<Vec<EventRecord>, ProtocolError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::{Key, MouseButton};
    use crate::protocol::codec::encode_event;
    use crate::protocol::messages::{EventKind, InputEvent, MAX_PAYLOAD_LENGTH, PROTOCOL_VERSION};

    #[test]
    fn test_partial_record_waits_for_more_bytes() {
        // Arrange
        let bytes = encode_event(&InputEvent::key_down(Key::A), 0, 0).unwrap();
        let mut decoder = EventStreamDecoder::new();

        // Act
        decoder.extend(&bytes[..10]);
        let first = decoder.next_record().unwrap();
        decoder.extend(&bytes[10..]);
        let second = decoder.next_record().unwrap();

        // Assert
        assert!(first.is_none());
        assert_eq!(second.map(|r| r.event), Some(InputEvent::key_down(Key::A)));
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_concatenated_records_are_split_in_order() {
        // Arrange
        let events = vec![
            InputEvent::pointer_move(1.0, 2.0),
            InputEvent::button_down(MouseButton::Left, 1.0, 2.0),
            InputEvent::key_up(Key::Esc),
        ];
        let mut stream = Vec::new();
        for (seq, event) in events.iter().enumerate() {
            stream.extend(encode_event(event, seq as u64, 0).unwrap());
        }
        let mut decoder = EventStreamDecoder::new();

        // Act
        decoder.extend(&stream);
        let records = decoder.drain_records().unwrap();

        // Assert
        let decoded: Vec<_> = records.iter().map(|r| r.event.clone()).collect();
        assert_eq!(decoded, events);
        let seqs: Vec<_> = records.iter().map(|r| r.header.sequence_number).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_oversized_length_fails_without_waiting_for_payload() {
        // Arrange
        let mut header = vec![PROTOCOL_VERSION, EventKind::PointerMove as u8, 0, 0];
        header.extend_from_slice(&(MAX_PAYLOAD_LENGTH as u32 + 1).to_be_bytes());
        header.extend_from_slice(&[0u8; 16]);
        let mut decoder = EventStreamDecoder::new();

        // Act
        decoder.extend(&header);
        let result = decoder.next_record();

        // Assert
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let mut decoder = EventStreamDecoder::new();
        decoder.extend(&[0x42; 30]);
        assert!(decoder.next_record().is_err());
    }
}
