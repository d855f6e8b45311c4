use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::permissions::PermissionMode;
use crate::thinking::ThinkingLevel;

/// The message envelope carried by the duplex transport.
///
/// Every message belongs to one of three protocol families: channel
/// lifecycle (`launch_claude` / `interrupt_claude` / `close_channel`),
/// streaming I/O (`io_message`), or the symmetric RPC exchange (`request` /
/// `response` / `cancel_request`). Channel ids and request ids are
/// independent id spaces: an RPC needs no channel and a channel needs no
/// outstanding RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Start a new conversation channel. The channel id is chosen by the
    /// caller and must not collide with an active channel.
    #[serde(rename_all = "camelCase")]
    LaunchClaude {
        channel_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resume: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permission_mode: Option<PermissionMode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thinking_level: Option<ThinkingLevel>,
    },
    /// One streamed item for a channel, in either direction. `done` marks
    /// the end of this direction's stream for that channel.
    #[serde(rename_all = "camelCase")]
    IoMessage {
        channel_id: String,
        message: Value,
        done: bool,
    },
    /// Out-of-band interrupt signal; does not terminate the channel.
    #[serde(rename_all = "camelCase")]
    InterruptClaude { channel_id: String },
    /// Channel teardown notice, in either direction.
    #[serde(rename_all = "camelCase")]
    CloseChannel {
        channel_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// An RPC request. Either side may initiate; the optional channel id is
    /// routing context only.
    #[serde(rename_all = "camelCase")]
    Request {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel_id: Option<String>,
        request_id: String,
        request: Value,
    },
    /// The single reply to a `request` with the same id. The body is the
    /// handler's value, or `{type:"error", error}` on failure.
    #[serde(rename_all = "camelCase")]
    Response { request_id: String, response: Value },
    /// Asks the peer to abandon an in-flight request it is handling.
    #[serde(rename_all = "camelCase")]
    CancelRequest { target_request_id: String },
}

impl WireMessage {
    /// The wire discriminator, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LaunchClaude { .. } => "launch_claude",
            Self::IoMessage { .. } => "io_message",
            Self::InterruptClaude { .. } => "interrupt_claude",
            Self::CloseChannel { .. } => "close_channel",
            Self::Request { .. } => "request",
            Self::Response { .. } => "response",
            Self::CancelRequest { .. } => "cancel_request",
        }
    }
}

pub fn parse_wire_message(raw: &str) -> Result<WireMessage> {
    serde_json::from_str::<WireMessage>(raw).context("failed to parse claudix wire message")
}

pub fn encode_wire_message(message: &WireMessage) -> Result<String> {
    serde_json::to_string(message).context("failed to encode claudix wire message")
}

/// Builds the error-shaped response body for a failed request.
pub fn error_response_body(message: &str) -> Value {
    json!({
        "type": "error",
        "error": message,
    })
}

/// Returns the error text when a response body carries the error shape.
pub fn response_error_text(body: &Value) -> Option<&str> {
    let object = body.as_object()?;
    if object.get("type").and_then(Value::as_str) != Some("error") {
        return None;
    }
    object.get("error").and_then(Value::as_str)
}
