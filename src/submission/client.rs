//! Rate-limited submission client.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::transport::{Transport, TransportError};
use crate::ratelimit::{Clock, RateGate, SystemClock};

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request went out and the service answered with this status code
    Sent(u16),
    /// The window budget was exhausted; nothing was sent
    RateLimited,
    /// The request was admitted but could not be delivered
    TransportFailure(String),
}

impl Outcome {
    /// Whether the request reached the service.
    pub fn is_sent(&self) -> bool {
        matches!(self, Outcome::Sent(_))
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Sent(status) => write!(f, "sent (status {})", status),
            Outcome::RateLimited => write!(f, "rate limited"),
            Outcome::TransportFailure(cause) => write!(f, "transport failure: {}", cause),
        }
    }
}

/// One document submission.
#[derive(Debug)]
pub struct SubmissionRequest<'a, D: ?Sized> {
    /// Target URL
    pub endpoint: &'a str,
    /// Opaque document payload
    pub document: &'a D,
    /// Detached signature of the document
    pub signature: &'a str,
}

/// Wire body: exactly `document` and `signature`.
#[derive(Serialize)]
struct RequestBody<'a, D: ?Sized> {
    document: &'a D,
    signature: &'a str,
}

/// Sends documents through a [`Transport`], admitting each one through a [`RateGate`].
///
/// A slot is consumed as soon as a submission is admitted. It is not handed
/// back if the send later fails.
pub struct SubmissionClient<T: Transport, C: Clock = SystemClock> {
    gate: Arc<RateGate<C>>,
    transport: T,
}

impl<T: Transport> SubmissionClient<T> {
    /// Create a client that owns its gate.
    pub fn new(gate: RateGate, transport: T) -> Self {
        Self::with_shared_gate(Arc::new(gate), transport)
    }
}

impl<T: Transport, C: Clock> SubmissionClient<T, C> {
    /// Create a client over a gate that may be shared with other clients.
    pub fn with_shared_gate(gate: Arc<RateGate<C>>, transport: T) -> Self {
        Self { gate, transport }
    }

    /// Get the gate deciding admissions for this client.
    pub fn gate(&self) -> &RateGate<C> {
        &self.gate
    }

    /// Submit `document` with `signature` to `endpoint`.
    pub async fn submit<D>(&self, endpoint: &str, document: &D, signature: &str) -> Outcome
    where
        D: Serialize + ?Sized,
    {
        self.submit_request(SubmissionRequest {
            endpoint,
            document,
            signature,
        })
        .await
    }

    /// Submit a prepared request.
    pub async fn submit_request<D>(&self, request: SubmissionRequest<'_, D>) -> Outcome
    where
        D: Serialize + ?Sized,
    {
        self.submit_with_shutdown(request, std::future::pending()).await
    }

    /// Submit a prepared request, giving up on the send once `signal` resolves.
    ///
    /// An abandoned send is reported as a transport failure. The admission it
    /// consumed stays counted.
    #[instrument(
        skip(self, request, signal),
        fields(
            endpoint = %request.endpoint,
            submission_id = %uuid::Uuid::new_v4()
        )
    )]
    pub async fn submit_with_shutdown<D, F>(
        &self,
        request: SubmissionRequest<'_, D>,
        signal: F,
    ) -> Outcome
    where
        D: Serialize + ?Sized,
        F: Future<Output = ()>,
    {
        if request.endpoint.trim().is_empty() {
            warn!("Refusing submission with empty endpoint");
            return Outcome::TransportFailure("endpoint is required".to_string());
        }

        if !self.gate.try_admit() {
            debug!(
                retry_in_ms = self.gate.duration_until_reset().as_millis() as u64,
                "Submission rate limited"
            );
            return Outcome::RateLimited;
        }

        let body = match serde_json::to_vec(&RequestBody {
            document: request.document,
            signature: request.signature,
        }) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to serialize submission body");
                return Outcome::TransportFailure(format!("failed to serialize body: {}", e));
            }
        };

        let result = tokio::select! {
            result = self.transport.post_json(request.endpoint, body) => result,
            _ = signal => Err(TransportError::Interrupted),
        };

        match result {
            Ok(status) => {
                info!(status, "Document submitted");
                Outcome::Sent(status)
            }
            Err(e) => {
                warn!(error = %e, "Document submission failed");
                Outcome::TransportFailure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{MockClock, RateLimiterConfig};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Clone, Default)]
    struct RecordingTransport {
        calls: Arc<AtomicUsize>,
        bodies: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn post_json(&self, endpoint: &str, body: Vec<u8>) -> Result<u16, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies.lock().push((endpoint.to_string(), body));
            Ok(201)
        }
    }

    struct FailingTransport(TransportError);

    #[async_trait]
    impl Transport for FailingTransport {
        async fn post_json(&self, _endpoint: &str, _body: Vec<u8>) -> Result<u16, TransportError> {
            Err(self.0.clone())
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn post_json(&self, _endpoint: &str, _body: Vec<u8>) -> Result<u16, TransportError> {
            std::future::pending().await
        }
    }

    const ENDPOINT: &str = "http://localhost/api/v3/lk/documents/create";

    #[tokio::test]
    async fn test_admitted_submission_is_sent() {
        let transport = RecordingTransport::default();
        let client = SubmissionClient::new(RateGate::new(3, 1000).unwrap(), transport.clone());

        let outcome = client.submit(ENDPOINT, &json!({"doc_id": "1"}), "sig").await;

        assert_eq!(outcome, Outcome::Sent(201));
        assert!(outcome.is_sent());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.gate().current_count(), 1);
    }

    #[tokio::test]
    async fn test_body_has_document_and_signature_only() {
        let transport = RecordingTransport::default();
        let client = SubmissionClient::new(RateGate::new(3, 1000).unwrap(), transport.clone());

        client
            .submit(ENDPOINT, &json!({"doc_id": "42", "products": []}), "c2lnbmF0dXJl")
            .await;

        let bodies = transport.bodies.lock();
        let (endpoint, body) = &bodies[0];
        assert_eq!(endpoint, ENDPOINT);

        let value: BTreeMap<String, Value> = serde_json::from_slice(body).unwrap();
        assert_eq!(value.keys().collect::<Vec<_>>(), vec!["document", "signature"]);
        assert_eq!(value["document"], json!({"doc_id": "42", "products": []}));
        assert_eq!(value["signature"], "c2lnbmF0dXJl");
    }

    #[tokio::test]
    async fn test_rejected_submission_makes_no_network_call() {
        let transport = RecordingTransport::default();
        let client = SubmissionClient::new(RateGate::new(1, 60_000).unwrap(), transport.clone());

        assert!(client.submit(ENDPOINT, &json!({}), "sig").await.is_sent());
        let outcome = client.submit(ENDPOINT, &json!({}), "sig").await;

        assert_eq!(outcome, Outcome::RateLimited);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.gate().snapshot().count, 1);
    }

    #[tokio::test]
    async fn test_interrupted_transport_keeps_slot_consumed() {
        let client = SubmissionClient::new(
            RateGate::new(2, 60_000).unwrap(),
            FailingTransport(TransportError::Interrupted),
        );

        let outcome = client.submit(ENDPOINT, &json!({}), "sig").await;

        assert!(matches!(outcome, Outcome::TransportFailure(_)));
        assert_eq!(client.gate().snapshot().count, 1);
        assert_eq!(client.gate().remaining(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_signal_abandons_send() {
        let client = SubmissionClient::new(RateGate::new(1, 60_000).unwrap(), HangingTransport);
        let document = json!({});
        let request = SubmissionRequest {
            endpoint: ENDPOINT,
            document: &document,
            signature: "sig",
        };

        let outcome = client
            .submit_with_shutdown(request, tokio::time::sleep(Duration::from_millis(20)))
            .await;

        assert_eq!(
            outcome,
            Outcome::TransportFailure(TransportError::Interrupted.to_string())
        );
        assert_eq!(client.gate().snapshot().count, 1);
    }

    #[tokio::test]
    async fn test_empty_endpoint_does_not_consume_slot() {
        let transport = RecordingTransport::default();
        let client = SubmissionClient::new(RateGate::new(1, 60_000).unwrap(), transport.clone());

        let outcome = client.submit("  ", &json!({}), "sig").await;

        assert!(matches!(outcome, Outcome::TransportFailure(_)));
        assert_eq!(client.gate().snapshot().count, 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_signature_is_sent() {
        let transport = RecordingTransport::default();
        let client = SubmissionClient::new(RateGate::new(1, 60_000).unwrap(), transport.clone());

        let outcome = client.submit(ENDPOINT, &json!({}), "").await;

        assert!(outcome.is_sent());
        let bodies = transport.bodies.lock();
        let value: Value = serde_json::from_slice(&bodies[0].1).unwrap();
        assert_eq!(value["signature"], "");
    }

    #[tokio::test]
    async fn test_unserializable_document_reports_failure() {
        // Maps with non-string keys cannot be written as JSON objects.
        let mut document = BTreeMap::new();
        document.insert(vec![1u8], "value");

        let transport = RecordingTransport::default();
        let client = SubmissionClient::new(RateGate::new(1, 60_000).unwrap(), transport.clone());

        let outcome = client.submit(ENDPOINT, &document, "sig").await;

        assert!(matches!(outcome, Outcome::TransportFailure(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.gate().snapshot().count, 1);
    }

    #[tokio::test]
    async fn test_shared_gate_limits_all_clients() {
        let gate = Arc::new(RateGate::new(2, 60_000).unwrap());
        let first = SubmissionClient::with_shared_gate(gate.clone(), RecordingTransport::default());
        let second = SubmissionClient::with_shared_gate(gate.clone(), RecordingTransport::default());

        assert!(first.submit(ENDPOINT, &json!({}), "a").await.is_sent());
        assert!(second.submit(ENDPOINT, &json!({}), "b").await.is_sent());
        assert_eq!(first.submit(ENDPOINT, &json!({}), "c").await, Outcome::RateLimited);
        assert_eq!(gate.snapshot().count, 2);
    }

    #[tokio::test]
    async fn test_budget_returns_after_window() {
        let clock = MockClock::new(Instant::now());
        let config = RateLimiterConfig::new(1, 1000).unwrap();
        let gate = Arc::new(RateGate::with_clock(config, clock.clone()).unwrap());
        let client = SubmissionClient::with_shared_gate(gate, RecordingTransport::default());

        assert!(client.submit(ENDPOINT, &json!({}), "sig").await.is_sent());
        assert_eq!(client.submit(ENDPOINT, &json!({}), "sig").await, Outcome::RateLimited);

        clock.advance(Duration::from_millis(1000));
        assert!(client.submit(ENDPOINT, &json!({}), "sig").await.is_sent());
        assert_eq!(client.gate().snapshot().generation, 1);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_respect_limit() {
        let transport = RecordingTransport::default();
        let client = Arc::new(SubmissionClient::new(
            RateGate::new(10, 60_000).unwrap(),
            transport.clone(),
        ));

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    client
                        .submit(ENDPOINT, &json!({ "n": i }), "sig")
                        .await
                })
            })
            .collect();

        let mut sent = 0;
        let mut limited = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Outcome::Sent(_) => sent += 1,
                Outcome::RateLimited => limited += 1,
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        assert_eq!(sent, 10);
        assert_eq!(limited, 40);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 10);
    }
}
