//! Window and OS input capability.
//!
//! The compositor needs to restore and minimize its window and to read the
//! current keyboard and mouse state once per tick.  Everything else about
//! the window (creation, message pump, focus) belongs to the host.
//!
//! # Testability
//!
//! [`scripted::ScriptedWindow`] is a window whose input state is set by
//! hand and which records restore/minimize calls.

use std::collections::HashSet;

use tilecast_core::{Key, MouseButton};

pub mod scripted;

/// Keys currently held down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardState {
    pressed: HashSet<Key>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn press(&mut self, key: Key) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.pressed.remove(&key);
    }
}

impl FromIterator<Key> for KeyboardState {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self {
            pressed: iter.into_iter().collect(),
        }
    }
}

/// Pointer position in window pixels plus button state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseState {
    pub x: i32,
    pub y: i32,
    buttons: [bool; 3],
}

impl MouseState {
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            buttons: [false; 3],
        }
    }

    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.buttons[button.index()]
    }

    pub fn set_pressed(&mut self, button: MouseButton, pressed: bool) {
        self.buttons[button.index()] = pressed;
    }
}

/// The compositor's window.
pub trait WindowHost {
    /// Shows the window, un-minimizing it if needed.
    fn restore(&mut self);
    fn minimize(&mut self);
    fn keyboard_state(&self) -> KeyboardState;
    fn mouse_state(&self) -> MouseState;
}
