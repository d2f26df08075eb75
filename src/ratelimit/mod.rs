//! Rate limiting gate and its configuration.

mod clock;
mod gate;
mod window;

pub use clock::{Clock, SystemClock};
pub use gate::{RateGate, WindowState};
pub use window::{RateLimiterConfig, TimeWindow};

#[cfg(test)]
pub(crate) use clock::MockClock;
