mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use claudix_protocol::{PermissionResult, WireMessage};

use support::{harness, launch_message, wait_until};

#[tokio::test]
async fn integration_worker_permission_request_round_trips_through_the_peer() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let h = harness(tempdir.path().to_path_buf());

    h.host.from_client(launch_message("c1")).expect("enqueue");
    let hub = Arc::clone(&h.hub);
    wait_until(move || hub.spawned("c1")).await;

    // The worker asks to use a tool and suspends on the answer.
    let callback = h.hub.callback("c1");
    let worker_call = tokio::spawn(async move {
        callback
            .can_use_tool("Bash", json!({"command": "cargo test"}), vec![])
            .await
    });

    // The exchange is observable while pending, exactly once.
    let broker = h.host.permissions();
    let observed = Arc::clone(&broker);
    wait_until(move || !observed.pending().is_empty()).await;
    let pending = broker.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].channel_id(), "c1");
    assert_eq!(pending[0].tool_name(), "Bash");
    assert_eq!(pending[0].inputs()["command"], "cargo test");

    // It rides the RPC lane as a tool_permission_request to the peer.
    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1);
    let (channel_id, request_id, body) = requests[0].clone();
    assert_eq!(channel_id.as_deref(), Some("c1"));
    assert_eq!(body["type"], "tool_permission_request");
    assert_eq!(pending[0].request_id(), request_id);

    h.host
        .from_client(WireMessage::Response {
            request_id,
            response: json!({
                "type": "tool_permission_response",
                "result": {"behavior": "allow"},
            }),
        })
        .expect("enqueue response");

    let decision = worker_call.await.expect("join").expect("decision");
    assert!(decision.is_allowed());
    assert!(broker.pending().is_empty());

    h.host.shutdown().await;
}

#[tokio::test]
async fn integration_locally_resolved_negotiation_unblocks_the_worker() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let h = harness(tempdir.path().to_path_buf());

    h.host.from_client(launch_message("c1")).expect("enqueue");
    let hub = Arc::clone(&h.hub);
    wait_until(move || hub.spawned("c1")).await;

    let callback = h.hub.callback("c1");
    let worker_call = tokio::spawn(async move {
        callback
            .can_use_tool("Edit", json!({"path": "src/lib.rs"}), vec![])
            .await
    });

    let broker = h.host.permissions();
    let observed = Arc::clone(&broker);
    wait_until(move || !observed.pending().is_empty()).await;

    let negotiation = broker.pending().remove(0);
    assert!(negotiation.resolve(PermissionResult::deny("review first")));
    // Settling twice stays a no-op.
    assert!(!negotiation.resolve(PermissionResult::allow()));

    let decision = worker_call.await.expect("join").expect("decision");
    assert_eq!(decision, PermissionResult::deny("review first"));
    assert!(broker.pending().is_empty());

    // The superseded RPC was cancelled toward the peer.
    let cancelled = h
        .transport
        .sent()
        .into_iter()
        .any(|message| matches!(message, WireMessage::CancelRequest { .. }));
    assert!(cancelled);

    h.host.shutdown().await;
}

#[tokio::test]
async fn integration_channel_close_abandons_pending_negotiations() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let h = harness(tempdir.path().to_path_buf());

    h.host.from_client(launch_message("c1")).expect("enqueue");
    let hub = Arc::clone(&h.hub);
    wait_until(move || hub.spawned("c1")).await;

    let callback = h.hub.callback("c1");
    let worker_call = tokio::spawn(async move {
        callback.can_use_tool("Bash", json!({}), vec![]).await
    });

    let broker = h.host.permissions();
    let observed = Arc::clone(&broker);
    wait_until(move || !observed.pending().is_empty()).await;
    let negotiation = broker.pending().remove(0);

    h.host
        .from_client(WireMessage::CloseChannel {
            channel_id: "c1".to_string(),
            error: None,
        })
        .expect("enqueue close");

    let registry = h.host.channels();
    wait_until(move || !registry.contains("c1")).await;

    // The entity is gone from the observable list but was not resolved;
    // nothing answers the abandoned worker call.
    assert!(broker.pending().is_empty());
    assert!(!negotiation.is_resolved());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!worker_call.is_finished());
    worker_call.abort();

    h.host.shutdown().await;
}
