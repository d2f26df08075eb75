//! HTTP transport used to deliver submission bodies.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;
use tracing::trace;

use crate::config::HttpConfig;
use crate::error::Result;

/// Errors raised while delivering a body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("interrupted while waiting for the response")]
    Interrupted,
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Trait for anything that can POST a JSON body and report the status code.
///
/// This is the seam between the submission client and the network; tests plug
/// in recording or failing implementations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `endpoint` as `application/json` and return the status code.
    async fn post_json(
        &self,
        endpoint: &str,
        body: Vec<u8>,
    ) -> std::result::Result<u16, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given timeouts.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        body: Vec<u8>,
    ) -> std::result::Result<u16, TransportError> {
        trace!(endpoint = %endpoint, bytes = body.len(), "Sending POST");

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}
