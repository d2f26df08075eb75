//! Document submission: body construction, transport and the rate-limited client.

mod client;
mod document;
mod transport;

pub use client::{Outcome, SubmissionClient, SubmissionRequest};
pub use document::{CrptDocument, Description, Product};
pub use transport::{HttpTransport, Transport, TransportError};
