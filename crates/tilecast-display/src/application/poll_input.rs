//! InputPoller: turns keyboard and mouse snapshots into edge events.
//!
//! The poller keeps one [`EdgeDetector`] per tracked key and per mouse
//! button, plus the last pointer position.  Each call to
//! [`InputPoller::poll`] compares the new snapshot against the previous one
//! and emits events in a fixed order:
//!
//! 1. `PointerMove` if the position changed (the first sample only records
//!    the position),
//! 2. button transitions for Left, Middle, Right,
//! 3. key transitions in [`TRACKED_KEYS`] order.
//!
//! Holding a key down produces exactly one `KeyDown`; releasing it produces
//! exactly one `KeyUp`.

use tilecast_core::{Edge, EdgeDetector, InputEvent, MouseButton, TRACKED_KEYS};

use crate::infrastructure::window::{KeyboardState, MouseState};

/// Edge-triggered keyboard and mouse sampler.
#[derive(Debug)]
pub struct InputPoller {
    keys: Vec<EdgeDetector>,
    buttons: [EdgeDetector; 3],
    last_position: Option<(i32, i32)>,
}

impl Default for InputPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl InputPoller {
    pub fn new() -> Self {
        Self {
            keys: vec![EdgeDetector::new(); TRACKED_KEYS.len()],
            buttons: [EdgeDetector::new(); 3],
            last_position: None,
        }
    }

    /// Compares the snapshots against the previous call and returns the
    /// resulting events.
    pub fn poll(&mut self, keyboard: &KeyboardState, mouse: &MouseState) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let (x, y) = (mouse.x, mouse.y);

        match self.last_position.replace((x, y)) {
            Some(previous) if previous != (x, y) => events.push(InputEvent::pointer_move(x as f32, y as f32)),
            _ => {}
        }

        for button in MouseButton::ALL {
            match self.buttons[button.index()].update(mouse.is_pressed(button)) {
                Some(Edge::Rising) => events.push(InputEvent::button_down(button, x as f32, y as f32)),
                Some(Edge::Falling) => events.push(InputEvent::button_up(button, x as f32, y as f32)),
                None => {}
            }
        }

        for (detector, key) in self.keys.iter_mut().zip(TRACKED_KEYS.iter().copied()) {
            match detector.update(keyboard.is_pressed(key)) {
                Some(Edge::Rising) => events.push(InputEvent::key_down(key)),
                Some(Edge::Falling) => events.push(InputEvent::key_up(key)),
                None => {}
            }
        }

        events
    }

    /// Forgets all previous state: nothing pressed, no known position.
    pub fn reset(&mut self) {
        for detector in self.keys.iter_mut().chain(self.buttons.iter_mut()) {
            detector.reset();
        }
        self.last_position = None;
    }
}
