//! Rate limiter configuration and named time windows.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CrptError, Result};

/// Named time window for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Per-second rate limiting
    Second,
    /// Per-minute rate limiting
    Minute,
    /// Per-hour rate limiting
    Hour,
    /// Per-day rate limiting
    Day,
}

impl TimeWindow {
    /// Get the duration of this time window.
    pub fn duration(&self) -> Duration {
        match self {
            TimeWindow::Second => Duration::from_secs(1),
            TimeWindow::Minute => Duration::from_secs(60),
            TimeWindow::Hour => Duration::from_secs(3600),
            TimeWindow::Day => Duration::from_secs(86400),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = CrptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "second" | "s" => Ok(TimeWindow::Second),
            "minute" | "m" => Ok(TimeWindow::Minute),
            "hour" | "h" => Ok(TimeWindow::Hour),
            "day" | "d" => Ok(TimeWindow::Day),
            other => Err(CrptError::Config(format!("unknown time window: {}", other))),
        }
    }
}

/// Limiter parameters: at most `max_requests` admissions per window of
/// `window_duration_ms` milliseconds.
///
/// Both values must be positive. [`RateLimiterConfig::new`] and
/// [`crate::ratelimit::RateGate::new`] reject zero values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum admissions per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds
    #[serde(default = "default_window_duration_ms")]
    pub window_duration_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_duration_ms: default_window_duration_ms(),
        }
    }
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_duration_ms() -> u64 {
    1000
}

impl RateLimiterConfig {
    /// Create a validated configuration.
    pub fn new(max_requests: u32, window_duration_ms: u64) -> Result<Self> {
        let config = Self {
            max_requests,
            window_duration_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a validated configuration for a named window.
    pub fn per(window: TimeWindow, max_requests: u32) -> Result<Self> {
        Self::new(max_requests, window.duration().as_millis() as u64)
    }

    /// Check that both limiter parameters are positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(CrptError::Config(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if self.window_duration_ms == 0 {
            return Err(CrptError::Config(
                "window_duration_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the window length as a `Duration`.
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_duration_ms)
    }
}
