use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use claudix_protocol::{IncomingRequest, PermissionMode, ThinkingLevel};

use crate::error::HostError;

/// The request handler table, consumed by the message router. One call per
/// inbound `request`; the returned value becomes the `response` body, and
/// any error becomes an error-shaped body with the failure's text.
///
/// Handlers observe `cancel` when the peer sends `cancel_request`; they
/// should abort promptly but are never forcibly terminated.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        request: IncomingRequest,
        channel_id: Option<String>,
        cancel: CancellationToken,
    ) -> anyhow::Result<Value>;
}

/// Session operations the settings-flavored handlers route back into the
/// host (`set_permission_mode`, `set_model`, `set_thinking_level`, and the
/// current thinking level for `init`).
#[async_trait]
pub trait SessionControl: Send + Sync {
    async fn set_permission_mode(
        &self,
        channel_id: &str,
        mode: PermissionMode,
    ) -> Result<(), HostError>;

    async fn set_model(&self, channel_id: &str, model: &str) -> Result<(), HostError>;

    async fn set_thinking_level(
        &self,
        channel_id: &str,
        level: ThinkingLevel,
    ) -> Result<(), HostError>;

    fn thinking_level(&self) -> ThinkingLevel;
}
