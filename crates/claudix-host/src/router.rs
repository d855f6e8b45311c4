use std::sync::Arc;

use claudix_protocol::WireMessage;

use crate::async_stream::StreamConsumer;
use crate::host::HostInner;

/// The single reader loop over the inbound stream.
///
/// Messages are consumed strictly in arrival order, but lifecycle and
/// request dispatch run as spawned tasks, so one slow launch or handler
/// never delays delivery to other channels. The loop itself only ends when
/// the inbound stream completes or fails; nothing a message does is fatal
/// to it.
pub(crate) async fn run(inner: Arc<HostInner>, mut inbound: StreamConsumer<WireMessage>) {
    loop {
        match inbound.next().await {
            Some(Ok(message)) => handle_message(&inner, message),
            Some(Err(error)) => {
                tracing::error!(error = %error, "inbound message stream failed");
                break;
            }
            None => {
                tracing::debug!("inbound message stream completed");
                break;
            }
        }
    }

    let orphaned = inner.registry.active_channels();
    if !orphaned.is_empty() {
        tracing::warn!(
            channels = ?orphaned,
            "message loop ended with channels still open"
        );
    }
}

fn handle_message(inner: &Arc<HostInner>, message: WireMessage) {
    match message {
        WireMessage::LaunchClaude {
            channel_id,
            resume,
            cwd,
            model,
            permission_mode,
            thinking_level,
        } => {
            // Registration is synchronous; only the worker spawn runs as a
            // background task.
            inner.launch_channel(channel_id, resume, cwd, model, permission_mode, thinking_level);
        }
        WireMessage::IoMessage {
            channel_id,
            message,
            done,
        } => {
            if let Err(error) = inner.registry.forward_input(&channel_id, message, done) {
                tracing::warn!(
                    channel_id = %channel_id,
                    error = %error,
                    "dropping io message"
                );
            }
        }
        WireMessage::InterruptClaude { channel_id } => {
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                inner.registry.interrupt(&channel_id).await;
            });
        }
        WireMessage::CloseChannel { channel_id, .. } => {
            // A client-initiated close is not echoed back, and the id is
            // free for relaunch as soon as this arm returns.
            inner.registry.close_detached(&channel_id, false, None);
        }
        WireMessage::Request {
            channel_id,
            request_id,
            request,
        } => {
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                inner.handle_request(channel_id, request_id, request).await;
            });
        }
        WireMessage::Response {
            request_id,
            response,
        } => inner.correlator.deliver_response(&request_id, response),
        WireMessage::CancelRequest { target_request_id } => {
            inner.correlator.cancel_inflight(&target_request_id)
        }
    }
}
