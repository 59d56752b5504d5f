//! Integration tests for the tilecast-core event protocol.
//!
//! These tests push realistic per-tick event batches through the public
//! encoder, split the resulting byte stream the way TCP might, and check that
//! the stream decoder reassembles every record in order with its sequence
//! number intact.

use tilecast_core::protocol::{encode_event, EventStreamDecoder, SequenceCounter};
use tilecast_core::{InputEvent, Key, MouseButton, TRACKED_KEYS};

/// One tick's worth of events in broadcast order: pointer, buttons, keys.
fn busy_tick() -> Vec<InputEvent> {
    let mut events = vec![InputEvent::pointer_move(512.0, 384.0)];
    for button in MouseButton::ALL {
        events.push(InputEvent::button_down(button, 512.0, 384.0));
    }
    events.extend(TRACKED_KEYS.iter().map(|k| InputEvent::key_down(*k)));
    events
}

fn encode_all(events: &[InputEvent], counter: &SequenceCounter) -> Vec<u8> {
    let mut stream = Vec::new();
    for event in events {
        stream.extend(encode_event(event, counter.next(), 0).expect("encode must succeed"));
    }
    stream
}

#[test]
fn test_stream_reassembles_records_split_at_arbitrary_boundaries() {
    // Arrange
    let events = busy_tick();
    let counter = SequenceCounter::new();
    let stream = encode_all(&events, &counter);
    let mut decoder = EventStreamDecoder::new();
    let mut decoded = Vec::new();

    // Act – feed the stream in uneven chunks (1, 2, 3, ... bytes)
    let mut offset = 0;
    let mut chunk = 1;
    while offset < stream.len() {
        let end = (offset + chunk).min(stream.len());
        decoder.extend(&stream[offset..end]);
        decoded.extend(decoder.drain_records().expect("stream must stay valid"));
        offset = end;
        chunk = chunk % 37 + 1;
    }

    // Assert
    assert_eq!(decoded.len(), events.len());
    for (i, (record, event)) in decoded.iter().zip(&events).enumerate() {
        assert_eq!(&record.event, event, "record {i}");
        assert_eq!(record.header.sequence_number, i as u64);
    }
    assert_eq!(decoder.buffered_len(), 0);
}

#[test]
fn test_sequence_numbers_continue_across_ticks() {
    // Arrange
    let counter = SequenceCounter::new();
    let first = encode_all(&[InputEvent::key_down(Key::A)], &counter);
    let second = encode_all(&[InputEvent::key_up(Key::A)], &counter);
    let mut decoder = EventStreamDecoder::new();

    // Act
    decoder.extend(&first);
    decoder.extend(&second);
    let records = decoder.drain_records().unwrap();

    // Assert
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].header.sequence_number, 0);
    assert_eq!(records[1].header.sequence_number, 1);
    assert_eq!(records[1].event.name(), "Keyboard/A/Up");
}
