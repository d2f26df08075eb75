//! crpt-client - Rate-limited document submission client
//!
//! This crate forwards signed documents to an HTTP endpoint as JSON while
//! keeping the number of submissions within a fixed per-window budget. The
//! budget is enforced in-process by a single [`ratelimit::RateGate`] shared by
//! every caller of a [`submission::SubmissionClient`].

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod submission;

pub use error::{CrptError, Result};
pub use ratelimit::{RateGate, RateLimiterConfig};
pub use submission::{Outcome, SubmissionClient};
