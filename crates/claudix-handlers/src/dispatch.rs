use std::sync::{Arc, OnceLock};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use claudix_host::{ConfigStore, RequestDispatcher, SessionControl, WorkspaceSurface};
use claudix_protocol::{IncomingRequest, RequestResponse};

use crate::surfaces::{
    AgentConfigSource, AssetCatalog, EditorSurface, McpDirectory, NotificationSurface,
    SessionStore,
};
use crate::{editor, files, sessions, state};

/// Collaborators the leaves work through. Mirrors what each handler
/// actually touches; nothing here is owned by the table.
#[derive(Clone)]
pub struct HandlerContext {
    pub workspace: Arc<dyn WorkspaceSurface>,
    pub editor: Arc<dyn EditorSurface>,
    pub notifications: Arc<dyn NotificationSurface>,
    pub sessions: Arc<dyn SessionStore>,
    pub mcp: Arc<dyn McpDirectory>,
    pub assets: Arc<dyn AssetCatalog>,
    pub agent_config: Arc<dyn AgentConfigSource>,
    pub config: Arc<dyn ConfigStore>,
}

/// The fixed discriminator → handler mapping the router dispatches into.
///
/// The session control backref is bound after construction (the host needs
/// the table to exist before it can exist itself); settings requests that
/// arrive before binding fail cleanly.
pub struct HandlerTable {
    context: HandlerContext,
    control: OnceLock<Arc<dyn SessionControl>>,
}

impl HandlerTable {
    pub fn new(context: HandlerContext) -> Arc<Self> {
        Arc::new(Self {
            context,
            control: OnceLock::new(),
        })
    }

    /// Binds the session control backref; a second bind is ignored.
    pub fn bind_control(&self, control: Arc<dyn SessionControl>) {
        if self.control.set(control).is_err() {
            tracing::warn!("session control already bound to handler table");
        }
    }

    fn control(&self) -> Result<&Arc<dyn SessionControl>> {
        match self.control.get() {
            Some(control) => Ok(control),
            None => bail!("session control is not wired yet"),
        }
    }

    fn require_channel(channel_id: Option<String>, request_kind: &str) -> Result<String> {
        match channel_id {
            Some(channel_id) => Ok(channel_id),
            None => bail!("channelId is required for {request_kind}"),
        }
    }
}

#[async_trait]
impl RequestDispatcher for HandlerTable {
    async fn dispatch(
        &self,
        request: IncomingRequest,
        channel_id: Option<String>,
        cancel: CancellationToken,
    ) -> Result<Value> {
        let context = &self.context;
        let response = match request {
            IncomingRequest::Init => {
                let thinking_level = self
                    .control
                    .get()
                    .map(|control| control.thinking_level())
                    .unwrap_or_default();
                state::handle_init(context, thinking_level)
            }
            IncomingRequest::GetClaudeState => state::handle_get_claude_state(context).await?,
            IncomingRequest::GetMcpServers => {
                state::handle_get_mcp_servers(context, channel_id).await?
            }
            IncomingRequest::GetAssetUris => state::handle_get_asset_uris(context),
            IncomingRequest::OpenFile {
                file_path,
                location,
            } => editor::handle_open_file(context, &file_path, location).await?,
            IncomingRequest::GetCurrentSelection => {
                editor::handle_get_current_selection(context).await
            }
            IncomingRequest::OpenDiff {
                original_file_path,
                new_file_path,
                edits,
                support_multi_edits: _,
            } => {
                editor::handle_open_diff(context, &original_file_path, new_file_path, edits, cancel)
                    .await?
            }
            IncomingRequest::OpenContent {
                content,
                file_name,
                editable,
            } => editor::handle_open_content(context, content, file_name, editable, cancel).await?,
            IncomingRequest::ShowNotification {
                message,
                severity,
                buttons,
                only_if_not_visible,
            } => {
                editor::handle_show_notification(
                    context,
                    message,
                    severity,
                    buttons.unwrap_or_default(),
                    only_if_not_visible.unwrap_or(false),
                )
                .await?
            }
            IncomingRequest::NewConversationTab { initial_prompt: _ } => {
                editor::handle_new_conversation_tab(context).await
            }
            IncomingRequest::RenameTab { title: _ } => {
                // Placeholder leaf: acknowledged, nothing to do yet.
                RequestResponse::RenameTabResponse
            }
            IncomingRequest::OpenUrl { url } => editor::handle_open_url(context, url).await?,
            IncomingRequest::OpenConfigFile { config_type } => {
                editor::handle_open_config_file(context, config_type).await?
            }
            IncomingRequest::SetPermissionMode { mode } => {
                let channel_id = Self::require_channel(channel_id, "set_permission_mode")?;
                self.control()?.set_permission_mode(&channel_id, mode).await?;
                RequestResponse::SetPermissionModeResponse { success: true }
            }
            IncomingRequest::SetModel { model } => {
                let channel_id = Self::require_channel(channel_id, "set_model")?;
                let target = model.value.trim();
                if target.is_empty() {
                    bail!("Invalid model selection");
                }
                self.control()?.set_model(&channel_id, target).await?;
                RequestResponse::SetModelResponse { success: true }
            }
            IncomingRequest::SetThinkingLevel {
                channel_id: request_channel_id,
                thinking_level,
            } => {
                let channel_id =
                    Self::require_channel(channel_id.or(request_channel_id), "set_thinking_level")?;
                self.control()?
                    .set_thinking_level(&channel_id, thinking_level)
                    .await?;
                RequestResponse::SetThinkingLevelResponse
            }
            IncomingRequest::ListSessions => sessions::handle_list_sessions(context).await,
            IncomingRequest::GetSession { session_id } => {
                sessions::handle_get_session(context, session_id).await
            }
            IncomingRequest::Exec { command, params } => {
                files::handle_exec(context, &command, &params).await
            }
            IncomingRequest::ListFiles { pattern } => {
                files::handle_list_files(context, pattern.as_deref()).await?
            }
            IncomingRequest::StatPath { paths } => files::handle_stat_path(context, &paths).await,
        };
        response.into_body()
    }
}
