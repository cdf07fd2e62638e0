//! Host-supplied collaborators: datagram transport and monotonic clock.
//!
//! The engine never opens sockets or reads the system time itself.  The
//! host hands it a [`Transport`] bound to a single switcher endpoint and a
//! [`Clock`]; tests substitute in-memory versions of both.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use thiserror::Error;

/// Errors reported by a [`Transport`] when a datagram cannot be sent.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying socket reported an I/O error.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been closed.
    #[error("transport is closed")]
    Closed,
}

/// Datagram transport to one switcher.
///
/// The destination (switcher address and protocol port) is fixed when the
/// transport is created, so `send` only takes the bytes.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Sends one datagram to the switcher.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the datagram could not be handed to the
    /// network.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Returns the next pending datagram without blocking, if any.
    fn try_receive(&mut self) -> Option<Vec<u8>>;

    /// Releases the underlying socket.  Further sends should fail with
    /// [`TransportError::Closed`].
    fn close(&mut self) {}
}

/// Monotonic millisecond time source.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.  Must never go backwards.
    fn now_ms(&self) -> u64;
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// advance the clock that the engine owns.
///
/// # Examples
///
/// ```rust
/// use atem_core::transport::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// let handle = clock.clone();
/// handle.advance(500);
/// assert_eq!(clock.now_ms(), 1_500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Moves the clock forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    /// Sets the absolute time.  Callers must not move it backwards.
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        // Arrange
        let clock = ManualClock::new(10);
        let handle = clock.clone();

        // Act
        handle.advance(90);

        // Assert
        assert_eq!(clock.now_ms(), 100);
    }

    #[test]
    fn test_manual_clock_set_overrides_time() {
        let clock = ManualClock::default();
        clock.set(5_000);
        assert_eq!(clock.now_ms(), 5_000);
    }

    #[test]
    fn test_transport_error_display_includes_cause() {
        let err = TransportError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(err.to_string().contains("refused"));
    }
}
