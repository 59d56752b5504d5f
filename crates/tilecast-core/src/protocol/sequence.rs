//! Sequence counter for event records.
//!
//! Every record an event server writes carries a sequence number taken from
//! one counter per server.  A listener can use gaps to notice it missed
//! records (for example after reconnecting).
//!
//! The counter uses `AtomicU64`, so it can be shared behind an `Arc` without
//! a lock even though the display loop itself is single-threaded.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter for record sequence numbers.
///
/// Starts at 0 and wraps at `u64::MAX` without panicking.
///
/// # Examples
///
/// ```rust
/// use tilecast_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number and advances the counter.
    pub fn next(&self) -> u64 {
        // Relaxed: the value orders records, it does not publish memory.
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](Self::next) will hand out.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_counter_starts_at_zero() {
        // Arrange
        let counter = SequenceCounter::new();

        // Act
        let first = counter.next();

        // Assert
        assert_eq!(first, 0);
    }

    #[test]
    fn test_sequence_counter_wraps_at_u64_max() {
        // Arrange – start the counter one step before overflow
        let counter = SequenceCounter {
            inner: AtomicU64::new(u64::MAX),
        };

        // Act
        let before_wrap = counter.next();
        let after_wrap = counter.next();

        // Assert
        assert_eq!(before_wrap, u64::MAX);
        assert_eq!(after_wrap, 0);
    }

    #[test]
    fn test_current_does_not_increment() {
        let counter = SequenceCounter::new();
        counter.next();

        assert_eq!(counter.current(), 1);
        assert_eq!(counter.next(), 1);
    }
}
