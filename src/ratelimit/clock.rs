//! Time sources for the rate gate.

use std::time::Instant;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// System clock implementation using `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock for deterministic window tests.
///
/// Clones share the same underlying time.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct MockClock {
    current: std::sync::Arc<parking_lot::Mutex<Instant>>,
}

#[cfg(test)]
impl MockClock {
    pub(crate) fn new(start: Instant) -> Self {
        Self {
            current: std::sync::Arc::new(parking_lot::Mutex::new(start)),
        }
    }

    pub(crate) fn advance(&self, by: std::time::Duration) {
        *self.current.lock() += by;
    }
}

#[cfg(test)]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}
