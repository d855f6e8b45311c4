use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use claudix_core::RequestIdGenerator;
use claudix_protocol::{response_error_text, WireMessage};

use crate::error::HostError;
use crate::transport::Transport;

/// Matches outgoing requests to their eventual responses by request id,
/// and tracks cancellation tokens for requests this side is answering.
///
/// Both ends of the transport run one of these; request ids and channel
/// ids are independent id spaces. A pending entry is removed on every
/// terminal outcome — response, peer error, or local cancellation — so the
/// table never leaks.
pub struct RpcCorrelator {
    transport: Arc<dyn Transport>,
    ids: RequestIdGenerator,
    pending: Mutex<HashMap<String, oneshot::Sender<Result<Value, HostError>>>>,
    cancellations: Mutex<HashMap<String, CancellationToken>>,
}

/// An in-flight request issued by this side. Await `response()` for the
/// single terminal outcome.
pub struct PendingRpc {
    request_id: String,
    receiver: oneshot::Receiver<Result<Value, HostError>>,
}

impl PendingRpc {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub async fn response(self) -> Result<Value, HostError> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            // Resolver dropped: the request was cancelled locally.
            Err(_) => Err(HostError::RpcCancelled),
        }
    }
}

impl RpcCorrelator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            ids: RequestIdGenerator::new(),
            pending: Mutex::new(HashMap::new()),
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a fresh pending entry and emits the `request` envelope
    /// before returning, so a response can never race the registration.
    pub fn send_request(&self, channel_id: Option<String>, request: Value) -> PendingRpc {
        let request_id = self.ids.next_id();
        let (resolver, receiver) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending request lock poisoned")
            .insert(request_id.clone(), resolver);
        self.transport.send(WireMessage::Request {
            channel_id,
            request_id: request_id.clone(),
            request,
        });
        PendingRpc {
            request_id,
            receiver,
        }
    }

    /// Settles the matching pending request. An unmatched response is a
    /// protocol anomaly: logged and dropped, never fatal.
    pub fn deliver_response(&self, request_id: &str, body: Value) {
        let resolver = self
            .pending
            .lock()
            .expect("pending request lock poisoned")
            .remove(request_id);
        let Some(resolver) = resolver else {
            tracing::warn!(
                request_id = %request_id,
                "dropping response with no outstanding request"
            );
            return;
        };
        let outcome = match response_error_text(&body) {
            Some(text) => Err(HostError::RpcPeer(text.to_string())),
            None => Ok(body),
        };
        let _ = resolver.send(outcome);
    }

    /// Requester-side cancellation: drops local bookkeeping and notifies
    /// the responder out-of-band. The responder may still be mid-handler
    /// and is free to keep going; nothing retries or times out here.
    pub fn cancel_request(&self, request_id: &str) {
        self.pending
            .lock()
            .expect("pending request lock poisoned")
            .remove(request_id);
        self.transport.send(WireMessage::CancelRequest {
            target_request_id: request_id.to_string(),
        });
    }

    /// Responder-side: creates the token a `cancel_request` from the peer
    /// will trigger while the handler for `request_id` runs.
    pub fn register_cancellation(&self, request_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.cancellations
            .lock()
            .expect("cancellation lock poisoned")
            .insert(request_id.to_string(), token.clone());
        token
    }

    /// Responder-side: the handler settled, the token is no longer
    /// discoverable.
    pub fn clear_cancellation(&self, request_id: &str) {
        self.cancellations
            .lock()
            .expect("cancellation lock poisoned")
            .remove(request_id);
    }

    /// Responder-side: the peer gave up on a request we are handling.
    /// Cancellation is cooperative; the in-flight handler observes the
    /// token and settles however it naturally does.
    pub fn cancel_inflight(&self, request_id: &str) {
        let token = self
            .cancellations
            .lock()
            .expect("cancellation lock poisoned")
            .remove(request_id);
        match token {
            Some(token) => token.cancel(),
            None => tracing::debug!(
                request_id = %request_id,
                "cancel for unknown in-flight request ignored"
            ),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .expect("pending request lock poisoned")
            .len()
    }

    pub fn has_pending(&self, request_id: &str) -> bool {
        self.pending
            .lock()
            .expect("pending request lock poisoned")
            .contains_key(request_id)
    }
}
