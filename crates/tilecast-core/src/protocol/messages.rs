//! Input-event message types.
//!
//! An event is a kind tag, a source path such as `"Keyboard/A"` or
//! `"Mouse/Position"`, and zero to two numeric fields (pointer coordinates).

use serde::{Deserialize, Serialize};

use crate::keymap::{Key, MouseButton};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Total size of the common record header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Maximum number of numeric fields an event may carry.
pub const MAX_FIELDS: usize = 2;

/// Largest payload a valid record can declare: the path length prefix, a
/// path of up to `u16::MAX` bytes, the field count and [`MAX_FIELDS`] `f32`s.
pub const MAX_PAYLOAD_LENGTH: usize = 2 + u16::MAX as usize + 1 + 4 * MAX_FIELDS;

/// Path of pointer-position events.
pub const POINTER_PATH: &str = "Mouse/Position";

// ── Event kinds ───────────────────────────────────────────────────────────────

/// Kind tag carried in the header's type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    KeyDown = 0x01,
    KeyUp = 0x02,
    PointerMove = 0x03,
    ButtonDown = 0x04,
    ButtonUp = 0x05,
}

impl TryFrom<u8> for EventKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(EventKind::KeyDown),
            0x02 => Ok(EventKind::KeyUp),
            0x03 => Ok(EventKind::PointerMove),
            0x04 => Ok(EventKind::ButtonDown),
            0x05 => Ok(EventKind::ButtonUp),
            _ => Err(()),
        }
    }
}

// ── Record header ─────────────────────────────────────────────────────────────

/// 24-byte header prepended to every event on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Protocol version; always [`PROTOCOL_VERSION`].
    pub version: u8,
    /// Kind of the event in the payload.
    pub kind: EventKind,
    /// Length of the payload in bytes (not including this header).
    pub payload_length: u32,
    /// Monotonically increasing per-server counter.
    pub sequence_number: u64,
    /// Microseconds since Unix epoch at time of generation.
    pub timestamp_us: u64,
}

// ── Events ────────────────────────────────────────────────────────────────────

/// One edge-triggered input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: EventKind,
    /// Source path, e.g. `"Keyboard/A"`, `"Mouse/Left"`, `"Mouse/Position"`.
    pub path: String,
    /// Zero to [`MAX_FIELDS`] numeric fields.
    pub fields: Vec<f32>,
}

impl InputEvent {
    pub fn key_down(key: Key) -> Self {
        Self::key(EventKind::KeyDown, key)
    }

    pub fn key_up(key: Key) -> Self {
        Self::key(EventKind::KeyUp, key)
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self {
            kind: EventKind::PointerMove,
            path: POINTER_PATH.to_string(),
            fields: vec![x, y],
        }
    }

    pub fn button_down(button: MouseButton, x: f32, y: f32) -> Self {
        Self::button(EventKind::ButtonDown, button, x, y)
    }

    pub fn button_up(button: MouseButton, x: f32, y: f32) -> Self {
        Self::button(EventKind::ButtonUp, button, x, y)
    }

    fn key(kind: EventKind, key: Key) -> Self {
        Self {
            kind,
            path: format!("Keyboard/{}", key.name()),
            fields: Vec::new(),
        }
    }

    fn button(kind: EventKind, button: MouseButton, x: f32, y: f32) -> Self {
        Self {
            kind,
            path: format!("Mouse/{}", button.name()),
            fields: vec![x, y],
        }
    }

    /// Full human-readable event name.
    ///
    /// Key events read `Keyboard/A/Down`, button events `Mouse/Left DOWN`,
    /// and pointer moves are just their path.
    pub fn name(&self) -> String {
        match self.kind {
            EventKind::KeyDown => format!("{}/Down", self.path),
            EventKind::KeyUp => format!("{}/Up", self.path),
            EventKind::ButtonDown => format!("{} DOWN", self.path),
            EventKind::ButtonUp => format!("{} UP", self.path),
            EventKind::PointerMove => self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_event_names() {
        assert_eq!(InputEvent::key_down(Key::A).name(), "Keyboard/A/Down");
        assert_eq!(InputEvent::key_up(Key::LeftArrow).name(), "Keyboard/LeftArrow/Up");
    }

    #[test]
    fn test_button_event_names_and_fields() {
        // Arrange / Act
        let event = InputEvent::button_down(MouseButton::Middle, 3.0, 4.0);

        // Assert
        assert_eq!(event.path, "Mouse/Middle");
        assert_eq!(event.name(), "Mouse/Middle DOWN");
        assert_eq!(event.fields, vec![3.0, 4.0]);
    }

    #[test]
    fn test_pointer_move_uses_position_path() {
        let event = InputEvent::pointer_move(10.0, 20.0);
        assert_eq!(event.name(), "Mouse/Position");
        assert_eq!(event.kind, EventKind::PointerMove);
    }

    #[test]
    fn test_key_events_carry_no_fields() {
        assert!(InputEvent::key_down(Key::Esc).fields.is_empty());
    }

    #[test]
    fn test_event_kind_try_from_rejects_unknown() {
        assert_eq!(EventKind::try_from(0x03), Ok(EventKind::PointerMove));
        assert_eq!(EventKind::try_from(0x00), Err(()));
        assert_eq!(EventKind::try_from(0x06), Err(()));
    }
}
