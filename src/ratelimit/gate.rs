//! Fixed-window admission gate.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::window::RateLimiterConfig;
use crate::error::Result;

/// Mutable window state guarded by the gate's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Admissions in the current window
    pub count: u32,
    /// When the current window started
    pub window_start: Instant,
    /// Number of rollovers since the gate was created
    pub generation: u64,
}

impl WindowState {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            generation: 0,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Admits at most `max_requests` callers per fixed window.
///
/// The window starts when the gate is created and restarts at the first
/// `try_admit` call after it has fully elapsed. It is not a sliding window:
/// a full burst is allowed right after every reset.
///
/// All decisions are serialized through one mutex. The lock is held only for
/// the duration of a decision, never while the caller does I/O.
pub struct RateGate<C: Clock = SystemClock> {
    config: RateLimiterConfig,
    clock: C,
    state: Mutex<WindowState>,
}

impl RateGate<SystemClock> {
    /// Create a gate admitting `max_requests` per `window_duration_ms` milliseconds.
    ///
    /// Fails with a configuration error if either value is zero.
    pub fn new(max_requests: u32, window_duration_ms: u64) -> Result<Self> {
        Self::with_config(RateLimiterConfig::new(max_requests, window_duration_ms)?)
    }

    /// Create a gate from an existing configuration.
    pub fn with_config(config: RateLimiterConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> RateGate<C> {
    /// Create a gate that reads time from `clock`.
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let state = WindowState::new(clock.now());
        Ok(Self {
            config,
            clock,
            state: Mutex::new(state),
        })
    }

    /// Decide whether one more caller may proceed.
    ///
    /// Rolls the window over first if it has expired, then admits and counts
    /// the caller if the budget allows. A rejected call leaves the state untouched.
    pub fn try_admit(&self) -> bool {
        let window = self.config.window_duration();
        let mut state = self.state.lock();
        let now = self.clock.now();

        if state.is_expired(now, window) {
            state.count = 0;
            state.window_start = now;
            state.generation += 1;
            debug!(generation = state.generation, "Rate limit window rolled over");
        }

        if state.count < self.config.max_requests {
            state.count += 1;
            trace!(
                count = state.count,
                limit = self.config.max_requests,
                "Admitted"
            );
            true
        } else {
            trace!(limit = self.config.max_requests, "Rejected, window budget exhausted");
            false
        }
    }

    /// Get the configuration this gate was built with.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Get a copy of the raw window state.
    pub fn snapshot(&self) -> WindowState {
        *self.state.lock()
    }

    /// Get the number of admissions counted in the live window.
    ///
    /// Reports zero once the window has expired, without resetting it.
    pub fn current_count(&self) -> u32 {
        let state = self.state.lock();
        if state.is_expired(self.clock.now(), self.config.window_duration()) {
            0
        } else {
            state.count
        }
    }

    /// Get the remaining admissions in the live window.
    pub fn remaining(&self) -> u32 {
        self.config.max_requests.saturating_sub(self.current_count())
    }

    /// Get the duration until the current window expires.
    pub fn duration_until_reset(&self) -> Duration {
        let window_start = self.state.lock().window_start;
        let elapsed = self.clock.now().saturating_duration_since(window_start);
        self.config.window_duration().saturating_sub(elapsed)
    }
}
