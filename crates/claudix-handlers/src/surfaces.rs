use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use claudix_protocol::{
    FileLocation, McpServerStatus, NotificationSeverity, SelectionRange, SessionSummary, TextEdit,
};

/// Editor-side operations the UI leaves delegate to. Implemented by the
/// embedding extension against its editor API.
#[async_trait]
pub trait EditorSurface: Send + Sync {
    async fn open_file(&self, path: PathBuf, location: Option<FileLocation>) -> Result<()>;

    /// Opens a diff view and returns the edits as the user left them. The
    /// token fires when the requesting peer cancels the request.
    async fn open_diff(
        &self,
        original_path: PathBuf,
        new_path: Option<PathBuf>,
        edits: Vec<TextEdit>,
        cancel: CancellationToken,
    ) -> Result<Vec<TextEdit>>;

    /// Opens ephemeral content in an editor tab; resolves with the edited
    /// content when `editable` and the user changed it.
    async fn open_content(
        &self,
        content: String,
        file_name: String,
        editable: bool,
        cancel: CancellationToken,
    ) -> Result<Option<String>>;

    async fn current_selection(&self) -> Option<SelectionRange>;

    async fn open_url(&self, url: String) -> Result<()>;

    async fn open_config_file(&self, config_type: String) -> Result<()>;

    async fn focus_conversation_view(&self) -> Result<()>;
}

#[async_trait]
pub trait NotificationSurface: Send + Sync {
    /// Shows a notification; resolves with the clicked button, if any.
    async fn show(
        &self,
        message: String,
        severity: NotificationSeverity,
        buttons: Vec<String>,
        only_if_not_visible: bool,
    ) -> Result<Option<String>>;
}

/// External session-history store. Persistence itself is out of scope for
/// the host; the handlers only read.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn list_sessions(&self, cwd: PathBuf) -> Result<Vec<SessionSummary>>;

    async fn session_messages(&self, session_id: String, cwd: PathBuf) -> Result<Vec<Value>>;
}

#[async_trait]
pub trait McpDirectory: Send + Sync {
    async fn servers(&self, channel_id: Option<String>) -> Result<Vec<McpServerStatus>>;
}

/// Webview asset URIs, keyed however the client expects them.
pub trait AssetCatalog: Send + Sync {
    fn asset_uris(&self) -> Value;
}

/// The agent configuration blob returned by `get_claude_state`.
#[async_trait]
pub trait AgentConfigSource: Send + Sync {
    async fn claude_config(&self) -> Result<Value>;
}
