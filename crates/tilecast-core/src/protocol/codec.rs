//! Binary codec for encoding and decoding input-event records.
//!
//! Wire format:
//! ```text
//! [version:1][kind:1][reserved:2][payload_len:4][seq:8][timestamp_us:8][payload:N]
//! payload: [path_len:2][path:utf8][field_count:1][field:f32]*field_count
//! ```
//! Total header size: 24 bytes. All multi-byte values are big-endian.
//! Records are self-delimiting, so any number of them can be written back to
//! back on one TCP stream.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::protocol::messages::{
    EventHeader, EventKind, InputEvent, HEADER_SIZE, MAX_FIELDS, MAX_PAYLOAD_LENGTH, PROTOCOL_VERSION,
};

/// Errors that can occur during event encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the header.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The kind byte in the header is not a recognized value.
    #[error("unknown event kind: 0x{0:02X}")]
    UnknownEventKind(u8),

    /// The protocol version in the header is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The payload could not be parsed or produced (UTF-8 error, too many
    /// fields, path too long, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The header declares more payload than is available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },
}

impl ProtocolError {
    /// `true` when the error only means "not enough bytes yet"; a stream
    /// reader should wait for more data instead of giving up.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            ProtocolError::InsufficientData { .. } | ProtocolError::PayloadLengthMismatch { .. }
        )
    }
}

/// A decoded record: header plus event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub header: EventHeader,
    pub event: InputEvent,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`InputEvent`] into a byte vector including the 24-byte header.
///
/// The sequence number is **not** set by this function – pass a value from a
/// [`crate::protocol::SequenceCounter`].
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] if the event carries more than
/// two fields or its path does not fit a 16-bit length prefix.
///
/// # Examples
///
/// ```rust
/// use tilecast_core::protocol::{decode_event, encode_event};
/// use tilecast_core::{InputEvent, Key};
///
/// let event = InputEvent::key_down(Key::A);
/// let bytes = encode_event(&event, 0, 0).unwrap();
/// let (decoded, consumed) = decode_event(&bytes).unwrap();
/// assert_eq!(decoded, event);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_event(
    event: &InputEvent,
    sequence_number: u64,
    timestamp_us: u64,
) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_payload(event)?;
    let payload_len = payload.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());

    // Header: version (1) + kind (1) + reserved (2) + payload_len (4) +
    //         seq (8) + timestamp_us (8) = 24 bytes
    buf.push(PROTOCOL_VERSION);
    buf.push(event.kind as u8);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&sequence_number.to_be_bytes());
    buf.extend_from_slice(&timestamp_us.to_be_bytes());

    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Encodes an [`InputEvent`] using the current system time as the timestamp.
///
/// # Errors
///
/// See [`encode_event`].
pub fn encode_event_now(event: &InputEvent, sequence_number: u64) -> Result<Vec<u8>, ProtocolError> {
    encode_event(event, sequence_number, current_timestamp_us())
}

/// Decodes and validates the 24-byte header at the start of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] if fewer than 24 bytes are
/// available, a version/kind error if the header is invalid, or
/// [`ProtocolError::MalformedPayload`] if the declared payload length exceeds
/// [`MAX_PAYLOAD_LENGTH`].
pub fn decode_header(bytes: &[u8]) -> Result<EventHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let kind_byte = bytes[1];
    let kind = EventKind::try_from(kind_byte).map_err(|_| ProtocolError::UnknownEventKind(kind_byte))?;

    // bytes[2..4] are reserved – ignored on decode

    let payload_length = read_u32(bytes, 4);
    if payload_length as usize > MAX_PAYLOAD_LENGTH {
        return Err(ProtocolError::MalformedPayload(format!(
            "declared payload length {payload_length} exceeds the maximum of {MAX_PAYLOAD_LENGTH}"
        )));
    }

    Ok(EventHeader {
        version,
        kind,
        payload_length,
        sequence_number: read_u64(bytes, 8),
        timestamp_us: read_u64(bytes, 16),
    })
}

/// Decodes one record from the beginning of `bytes`.
///
/// Returns the record and the total number of bytes consumed (header +
/// payload), so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are malformed or incomplete.
pub fn decode_record(bytes: &[u8]) -> Result<(EventRecord, usize), ProtocolError> {
    let header = decode_header(bytes)?;
    let payload_len = header.payload_length as usize;

    let total_needed = HEADER_SIZE + payload_len;
    if bytes.len() < total_needed {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared: payload_len,
            available: bytes.len() - HEADER_SIZE,
        });
    }

    let payload = &bytes[HEADER_SIZE..total_needed];
    let event = decode_payload(header.kind, payload)?;
    Ok((EventRecord { header, event }, total_needed))
}

/// Decodes one [`InputEvent`] from the beginning of `bytes`, discarding the
/// header metadata.
///
/// # Errors
///
/// See [`decode_record`].
pub fn decode_event(bytes: &[u8]) -> Result<(InputEvent, usize), ProtocolError> {
    decode_record(bytes).map(|(record, consumed)| (record.event, consumed))
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(event: &InputEvent) -> Result<Vec<u8>, ProtocolError> {
    if event.fields.len() > MAX_FIELDS {
        return Err(ProtocolError::MalformedPayload(format!(
            "{} fields exceeds the maximum of {MAX_FIELDS}",
            event.fields.len()
        )));
    }
    if event.path.len() > u16::MAX as usize {
        return Err(ProtocolError::MalformedPayload(format!(
            "path of {} bytes does not fit a 16-bit length",
            event.path.len()
        )));
    }

    let mut buf = Vec::with_capacity(2 + event.path.len() + 1 + 4 * event.fields.len());
    write_length_prefixed_string(&mut buf, &event.path);
    buf.push(event.fields.len() as u8);
    for field in &event.fields {
        buf.extend_from_slice(&field.to_be_bytes());
    }
    Ok(buf)
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_payload(kind: EventKind, p: &[u8]) -> Result<InputEvent, ProtocolError> {
    let (path, path_end) = read_length_prefixed_string(p, 0)?;
    require_len(p, path_end + 1, "field count")?;
    let count = p[path_end] as usize;
    if count > MAX_FIELDS {
        return Err(ProtocolError::MalformedPayload(format!(
            "field count {count} exceeds the maximum of {MAX_FIELDS}"
        )));
    }

    let fields_start = path_end + 1;
    require_len(p, fields_start + 4 * count, "fields")?;
    let fields = (0..count)
        .map(|i| f32::from_bits(read_u32(p, fields_start + 4 * i)))
        .collect();

    Ok(InputEvent { kind, path, fields })
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn current_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

fn require_len(buf: &[u8], needed: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

/// Callers must have checked that `offset + 4` bytes are available.
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Callers must have checked that `offset + 8` bytes are available.
fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

/// Writes a 2-byte length prefix followed by the UTF-8 string bytes.
fn write_length_prefixed_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u16::MAX as usize) as u16;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&bytes[..len as usize]);
}

/// Reads a 2-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after the string.
fn read_length_prefixed_string(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if buf.len() < offset + 2 {
        return Err(ProtocolError::MalformedPayload(format!(
            "need 2 bytes for string length at offset {offset}"
        )));
    }
    let len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as usize;
    let start = offset + 2;
    if buf.len() < start + len {
        return Err(ProtocolError::MalformedPayload(format!(
            "string of length {len} at offset {start} exceeds buffer"
        )));
    }
    let s = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, start + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
