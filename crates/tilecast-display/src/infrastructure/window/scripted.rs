//! Scripted window for tests and headless runs.
//!
//! Clones share state, so a test can keep one handle to press keys and move
//! the pointer while the compositor owns another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tilecast_core::{Key, MouseButton};

use super::{KeyboardState, MouseState, WindowHost};

#[derive(Debug, Default)]
struct WindowState {
    keyboard: KeyboardState,
    mouse: MouseState,
    minimized: bool,
    restores: u32,
    minimizes: u32,
}

/// A [`WindowHost`] whose input is set by hand.
#[derive(Debug, Clone, Default)]
pub struct ScriptedWindow {
    state: Arc<Mutex<WindowState>>,
}

impl ScriptedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn press(&self, key: Key) {
        self.state().keyboard.press(key);
    }

    pub fn release(&self, key: Key) {
        self.state().keyboard.release(key);
    }

    pub fn move_pointer(&self, x: i32, y: i32) {
        let mut state = self.state();
        state.mouse.x = x;
        state.mouse.y = y;
    }

    pub fn press_button(&self, button: MouseButton) {
        self.state().mouse.set_pressed(button, true);
    }

    pub fn release_button(&self, button: MouseButton) {
        self.state().mouse.set_pressed(button, false);
    }

    /// Number of `restore()` calls so far.
    pub fn restore_count(&self) -> u32 {
        self.state().restores
    }

    /// Number of `minimize()` calls so far.
    pub fn minimize_count(&self) -> u32 {
        self.state().minimizes
    }

    pub fn is_minimized(&self) -> bool {
        self.state().minimized
    }
}

impl WindowHost for ScriptedWindow {
    fn restore(&mut self) {
        let mut state = self.state();
        state.minimized = false;
        state.restores += 1;
    }

    fn minimize(&mut self) {
        let mut state = self.state();
        state.minimized = true;
        state.minimizes += 1;
    }

    fn keyboard_state(&self) -> KeyboardState {
        self.state().keyboard.clone()
    }

    fn mouse_state(&self) -> MouseState {
        self.state().mouse
    }
}
