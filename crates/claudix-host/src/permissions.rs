use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;

use claudix_protocol::{OutgoingRequest, PermissionResult, ToolPermissionResponse};

use crate::correlator::RpcCorrelator;
use crate::error::HostError;

/// One suspended tool-permission exchange, keyed by the RPC request id it
/// rides on. Observable while pending so a local surface can render and,
/// if it wants, answer it ahead of the remote peer.
pub struct PermissionNegotiation {
    request_id: String,
    channel_id: String,
    tool_name: String,
    inputs: Value,
    suggestions: Vec<Value>,
    decision: Mutex<Option<oneshot::Sender<PermissionResult>>>,
}

impl PermissionNegotiation {
    fn new(
        request_id: String,
        channel_id: String,
        tool_name: String,
        inputs: Value,
        suggestions: Vec<Value>,
    ) -> (Arc<Self>, oneshot::Receiver<PermissionResult>) {
        let (sender, receiver) = oneshot::channel();
        let negotiation = Arc::new(Self {
            request_id,
            channel_id,
            tool_name,
            inputs,
            suggestions,
            decision: Mutex::new(Some(sender)),
        });
        (negotiation, receiver)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn inputs(&self) -> &Value {
        &self.inputs
    }

    pub fn suggestions(&self) -> &[Value] {
        &self.suggestions
    }

    /// Settles the negotiation locally. Returns false when it was already
    /// settled — a second resolve is a no-op, never a crash.
    pub fn resolve(&self, result: PermissionResult) -> bool {
        let sender = self
            .decision
            .lock()
            .expect("negotiation decision lock poisoned")
            .take();
        match sender {
            Some(sender) => {
                let _ = sender.send(result);
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.decision
            .lock()
            .expect("negotiation decision lock poisoned")
            .is_none()
    }
}

/// Owns the observable list of pending negotiations and runs the suspend
/// protocol: ask the peer over RPC, publish the entity, settle on
/// whichever answer lands first.
pub struct PermissionBroker {
    pending: Mutex<Vec<Arc<PermissionNegotiation>>>,
}

impl PermissionBroker {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Asks the channel's peer whether the worker may use `tool_name`.
    /// Suspends until the remote response or a local `resolve` settles the
    /// negotiation; the published entity is removed exactly once on any
    /// outcome.
    pub async fn negotiate(
        &self,
        correlator: &RpcCorrelator,
        channel_id: &str,
        tool_name: &str,
        inputs: Value,
        suggestions: Vec<Value>,
    ) -> Result<PermissionResult, HostError> {
        let request = serde_json::to_value(OutgoingRequest::ToolPermissionRequest {
            tool_name: tool_name.to_string(),
            inputs: inputs.clone(),
            suggestions: suggestions.clone(),
        })
        .map_err(|error| HostError::Worker(format!("failed to encode permission request: {error}")))?;

        let pending_rpc = correlator.send_request(Some(channel_id.to_string()), request);
        let (negotiation, mut local_decision) = PermissionNegotiation::new(
            pending_rpc.request_id().to_string(),
            channel_id.to_string(),
            tool_name.to_string(),
            inputs,
            suggestions,
        );
        let request_id = negotiation.request_id().to_string();
        self.publish(Arc::clone(&negotiation));

        let outcome = tokio::select! {
            remote = pending_rpc.response() => remote.and_then(parse_permission_response),
            local = &mut local_decision => {
                // A local answer supersedes the RPC: drop its bookkeeping
                // and let the peer know the exchange is over.
                correlator.cancel_request(&request_id);
                local.map_err(|_| HostError::RpcCancelled)
            }
        };
        self.remove(&request_id);
        outcome
    }

    fn publish(&self, negotiation: Arc<PermissionNegotiation>) {
        self.pending
            .lock()
            .expect("permission broker lock poisoned")
            .push(negotiation);
    }

    /// Removes by request id; absent ids are already-removed entities and
    /// stay a no-op.
    pub fn remove(&self, request_id: &str) -> Option<Arc<PermissionNegotiation>> {
        let mut pending = self.pending.lock().expect("permission broker lock poisoned");
        let index = pending
            .iter()
            .position(|negotiation| negotiation.request_id() == request_id)?;
        Some(pending.remove(index))
    }

    /// Cleanup path for an abandoned owner: drops the channel's pending
    /// negotiations without resolving them.
    pub fn remove_channel(&self, channel_id: &str) -> usize {
        let mut pending = self.pending.lock().expect("permission broker lock poisoned");
        let before = pending.len();
        pending.retain(|negotiation| negotiation.channel_id() != channel_id);
        before - pending.len()
    }

    /// Snapshot of the pending negotiations, for a UI to render.
    pub fn pending(&self) -> Vec<Arc<PermissionNegotiation>> {
        self.pending
            .lock()
            .expect("permission broker lock poisoned")
            .clone()
    }
}

impl Default for PermissionBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_permission_response(body: Value) -> Result<PermissionResult, HostError> {
    serde_json::from_value::<ToolPermissionResponse>(body)
        .map(|response| response.result)
        .map_err(|error| HostError::RpcPeer(format!("malformed tool permission response: {error}")))
}
