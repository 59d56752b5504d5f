//! Keys and mouse buttons whose transitions Tilecast reports.
//!
//! The set of reported keys is a fixed table known at build time
//! ([`TRACKED_KEYS`]).  Keys outside the table are never reported, whatever
//! the window system delivers.

pub mod keys;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use keys::{Key, UnknownKey, TRACKED_KEYS};

/// Mouse buttons whose transitions are reported, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// All reported buttons, in report order.
    pub const ALL: [MouseButton; 3] = [MouseButton::Left, MouseButton::Middle, MouseButton::Right];

    /// Name used in event paths (`Mouse/<name>`).
    pub fn name(self) -> &'static str {
        match self {
            MouseButton::Left => "Left",
            MouseButton::Middle => "Middle",
            MouseButton::Right => "Right",
        }
    }

    /// Position of this button in [`MouseButton::ALL`].
    pub fn index(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
