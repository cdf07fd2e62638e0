//! 16-bit packet id counter and wrap-aware ordering helpers.
//!
//! # What is a packet id? (for beginners)
//!
//! Every reliable packet sent to the switcher carries a 16-bit *packet id*
//! in bytes 10..12 of its header.  The switcher uses these ids to:
//!
//! - **Acknowledge** what it has received (an AckReply names the id).
//! - **Ask for repairs** – a RetransmitRequest names the first id it is
//!   missing, and the client replays that packet and everything after it.
//!
//! The switcher numbers its own packets the same way, and the client tracks
//! the highest id it has seen from the device.
//!
//! # Wrap-around
//!
//! Ids are `u16` and wrap from `0xFFFF` back to `0`.  Comparisons therefore
//! use serial-number arithmetic: `b` is "at or after" `a` when walking
//! forward from `a` reaches `b` in less than half the id space.
//!
//! # Thread safety
//!
//! The engine is single-threaded and owns its counter outright, so a plain
//! `u16` is enough; no atomics or locks are involved.

/// Half of the 16-bit id space; the window used for wrap-aware ordering.
const HALF_RANGE: u16 = 0x8000;

/// A monotonically increasing, wrapping 16-bit packet id counter.
///
/// # Examples
///
/// ```rust
/// use atem_core::protocol::SequenceCounter;
///
/// let mut counter = SequenceCounter::starting_at(1);
/// assert_eq!(counter.next(), 1);
/// assert_eq!(counter.next(), 2);
/// assert_eq!(counter.current(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceCounter {
    value: u16,
}

impl SequenceCounter {
    /// Creates a counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter whose next id is `value`.
    pub fn starting_at(value: u16) -> Self {
        Self { value }
    }

    /// Returns the next id and advances the counter, wrapping at `u16::MAX`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u16 {
        let id = self.value;
        self.value = self.value.wrapping_add(1);
        id
    }

    /// Returns the id the next call to [`next`](Self::next) will hand out.
    pub fn current(&self) -> u16 {
        self.value
    }
}

/// Returns `true` if `id` is equal to `from` or comes after it, taking
/// wrap-around into account.
pub fn is_at_or_after(id: u16, from: u16) -> bool {
    id.wrapping_sub(from) < HALF_RANGE
}

/// Returns `true` if `id` comes strictly after `reference`.
pub fn is_newer(id: u16, reference: u16) -> bool {
    id != reference && is_at_or_after(id, reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_counter_starts_at_zero() {
        // Arrange
        let mut counter = SequenceCounter::new();

        // Act
        let first = counter.next();

        // Assert
        assert_eq!(first, 0);
    }

    #[test]
    fn test_sequence_counter_increments_by_one() {
        let mut counter = SequenceCounter::starting_at(5);

        let values: Vec<u16> = (0..4).map(|_| counter.next()).collect();

        assert_eq!(values, vec![5, 6, 7, 8]);
        assert_eq!(counter.current(), 9);
    }

    #[test]
    fn test_sequence_counter_wraps_at_u16_max() {
        // Arrange – start the counter one step before overflow
        let mut counter = SequenceCounter::starting_at(u16::MAX);

        // Act
        let before_wrap = counter.next();
        let after_wrap = counter.next();

        // Assert
        assert_eq!(before_wrap, u16::MAX);
        assert_eq!(after_wrap, 0, "counter must wrap to 0 after u16::MAX");
    }

    #[test]
    fn test_current_does_not_increment() {
        let mut counter = SequenceCounter::new();
        counter.next();

        let current = counter.current();
        let next = counter.next();

        assert_eq!(current, 1, "current() should return 1 without advancing");
        assert_eq!(next, 1);
    }

    #[test]
    fn test_is_at_or_after_handles_plain_ordering() {
        assert!(is_at_or_after(6, 6));
        assert!(is_at_or_after(8, 6));
        assert!(!is_at_or_after(5, 6));
    }

    #[test]
    fn test_is_at_or_after_handles_wrap_around() {
        assert!(is_at_or_after(2, 0xFFFE), "2 follows 0xFFFE after wrapping");
        assert!(!is_at_or_after(0xFFFE, 2));
    }

    #[test]
    fn test_is_newer_excludes_equal_ids() {
        assert!(!is_newer(10, 10));
        assert!(is_newer(11, 10));
        assert!(is_newer(0, u16::MAX));
    }
}
