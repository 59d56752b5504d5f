//! Edge detection for sampled boolean state.
//!
//! Several parts of Tilecast only care about *changes*: the compositor reacts
//! when "any tile is receiving video" flips, and the input poller reports a
//! key only when it goes down or comes back up.  [`EdgeDetector`] holds the
//! previous sample and reports the transition, if any, each time a new sample
//! is fed in.

use serde::{Deserialize, Serialize};

/// Direction of a boolean transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    /// `false` → `true`.
    Rising,
    /// `true` → `false`.
    Falling,
}

/// Remembers the last sampled value and reports transitions.
///
/// The initial previous value is `false`, so a first sample of `true` is a
/// rising edge.
///
/// # Examples
///
/// ```rust
/// use tilecast_core::{Edge, EdgeDetector};
///
/// let mut detector = EdgeDetector::new();
/// assert_eq!(detector.update(false), None);
/// assert_eq!(detector.update(true), Some(Edge::Rising));
/// assert_eq!(detector.update(true), None);
/// assert_eq!(detector.update(false), Some(Edge::Falling));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    /// Creates a detector whose previous sample is `false`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the current sample and returns the edge it forms with the
    /// previous one.  The current sample then becomes the previous one.
    pub fn update(&mut self, current: bool) -> Option<Edge> {
        let edge = match (self.previous, current) {
            (false, true) => Some(Edge::Rising),
            (true, false) => Some(Edge::Falling),
            _ => None,
        };
        self.previous = current;
        edge
    }

    /// The most recent sample.
    pub fn current(&self) -> bool {
        self.previous
    }

    /// Forgets the previous sample, returning to the initial `false` state.
    pub fn reset(&mut self) {
        self.previous = false;
    }
}
