//! Keyboard keys known to Tilecast and the fixed table of keys whose
//! transitions are broadcast.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A keyboard key.
///
/// Only the keys listed in [`TRACKED_KEYS`] are ever reported as events.
/// [`Key::Slash`] exists so it can be bound as the window's minimize hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Space,
    Enter,
    LeftArrow,
    RightArrow,
    UpArrow,
    DownArrow,
    Comma,
    Period,
    LeftShift,
    RightShift,
    LeftAlt,
    RightAlt,
    LeftControl,
    RightControl,
    Tab,
    Delete,
    Plus,
    Minus,
    Esc,
    Slash,
}

/// Keys whose press/release transitions are broadcast, in report order.
pub static TRACKED_KEYS: [Key; 55] = [
    Key::A,
    Key::B,
    Key::C,
    Key::D,
    Key::E,
    Key::F,
    Key::G,
    Key::H,
    Key::I,
    Key::J,
    Key::K,
    Key::L,
    Key::M,
    Key::N,
    Key::O,
    Key::P,
    Key::Q,
    Key::R,
    Key::S,
    Key::T,
    Key::U,
    Key::V,
    Key::W,
    Key::X,
    Key::Y,
    Key::Z,
    Key::Digit0,
    Key::Digit1,
    Key::Digit2,
    Key::Digit3,
    Key::Digit4,
    Key::Digit5,
    Key::Digit6,
    Key::Digit7,
    Key::Digit8,
    Key::Digit9,
    Key::Space,
    Key::Enter,
    Key::LeftArrow,
    Key::RightArrow,
    Key::UpArrow,
    Key::DownArrow,
    Key::Comma,
    Key::Period,
    Key::LeftShift,
    Key::RightShift,
    Key::LeftAlt,
    Key::RightAlt,
    Key::LeftControl,
    Key::RightControl,
    Key::Tab,
    Key::Delete,
    Key::Plus,
    Key::Minus,
    Key::Esc,
];

impl Key {
    /// Name used in event paths (`Keyboard/<name>`) and configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Key::A => "A",
            Key::B => "B",
            Key::C => "C",
            Key::D => "D",
            Key::E => "E",
            Key::F => "F",
            Key::G => "G",
            Key::H => "H",
            Key::I => "I",
            Key::J => "J",
            Key::K => "K",
            Key::L => "L",
            Key::M => "M",
            Key::N => "N",
            Key::O => "O",
            Key::P => "P",
            Key::Q => "Q",
            Key::R => "R",
            Key::S => "S",
            Key::T => "T",
            Key::U => "U",
            Key::V => "V",
            Key::W => "W",
            Key::X => "X",
            Key::Y => "Y",
            Key::Z => "Z",
            Key::Digit0 => "0",
            Key::Digit1 => "1",
            Key::Digit2 => "2",
            Key::Digit3 => "3",
            Key::Digit4 => "4",
            Key::Digit5 => "5",
            Key::Digit6 => "6",
            Key::Digit7 => "7",
            Key::Digit8 => "8",
            Key::Digit9 => "9",
            Key::Space => "Space",
            Key::Enter => "Enter",
            Key::LeftArrow => "LeftArrow",
            Key::RightArrow => "RightArrow",
            Key::UpArrow => "UpArrow",
            Key::DownArrow => "DownArrow",
            Key::Comma => "Comma",
            Key::Period => "Period",
            Key::LeftShift => "LeftShift",
            Key::RightShift => "RightShift",
            Key::LeftAlt => "LeftAlt",
            Key::RightAlt => "RightAlt",
            Key::LeftControl => "LeftControl",
            Key::RightControl => "RightControl",
            Key::Tab => "Tab",
            Key::Delete => "Delete",
            Key::Plus => "Plus",
            Key::Minus => "Minus",
            Key::Esc => "Esc",
            Key::Slash => "Slash",
        }
    }

    /// Whether this key's transitions are broadcast.
    pub fn is_tracked(self) -> bool {
        self != Key::Slash
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a key name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name: {0:?}")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    /// Parses a key name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TRACKED_KEYS
            .iter()
            .copied()
            .chain(std::iter::once(Key::Slash))
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}
