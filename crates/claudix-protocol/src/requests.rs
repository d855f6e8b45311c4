use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::permissions::PermissionMode;
use crate::thinking::ThinkingLevel;

/// Requests the client surface sends to the host, one variant per
/// discriminator in the dispatch table. Unknown discriminators fail the
/// parse and come back to the peer as an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingRequest {
    Init,
    GetClaudeState,
    GetMcpServers,
    GetAssetUris,
    #[serde(rename_all = "camelCase")]
    OpenFile {
        file_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<FileLocation>,
    },
    GetCurrentSelection,
    #[serde(rename_all = "camelCase")]
    OpenDiff {
        original_file_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_file_path: Option<String>,
        edits: Vec<TextEdit>,
        support_multi_edits: bool,
    },
    #[serde(rename_all = "camelCase")]
    OpenContent {
        content: String,
        file_name: String,
        editable: bool,
    },
    #[serde(rename_all = "camelCase")]
    ShowNotification {
        message: String,
        severity: NotificationSeverity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        buttons: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        only_if_not_visible: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    NewConversationTab {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_prompt: Option<String>,
    },
    RenameTab {
        title: String,
    },
    OpenUrl {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    OpenConfigFile {
        config_type: String,
    },
    SetPermissionMode {
        mode: PermissionMode,
    },
    SetModel {
        model: ModelOption,
    },
    #[serde(rename_all = "camelCase")]
    SetThinkingLevel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel_id: Option<String>,
        thinking_level: ThinkingLevel,
    },
    #[serde(rename = "list_sessions_request")]
    ListSessions,
    #[serde(rename = "get_session_request", rename_all = "camelCase")]
    GetSession {
        session_id: String,
    },
    Exec {
        command: String,
        params: Vec<String>,
    },
    #[serde(rename = "list_files_request")]
    ListFiles {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    /// Entries that are not strings are skipped by the handler rather than
    /// failing the whole request, so the list stays loosely typed here.
    #[serde(rename = "stat_path_request")]
    StatPath {
        paths: Vec<Value>,
    },
}

impl IncomingRequest {
    /// Parses the payload of a `request` envelope.
    pub fn from_value(body: &Value) -> Result<Self> {
        serde_json::from_value(body.clone()).context("invalid request format")
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::GetClaudeState => "get_claude_state",
            Self::GetMcpServers => "get_mcp_servers",
            Self::GetAssetUris => "get_asset_uris",
            Self::OpenFile { .. } => "open_file",
            Self::GetCurrentSelection => "get_current_selection",
            Self::OpenDiff { .. } => "open_diff",
            Self::OpenContent { .. } => "open_content",
            Self::ShowNotification { .. } => "show_notification",
            Self::NewConversationTab { .. } => "new_conversation_tab",
            Self::RenameTab { .. } => "rename_tab",
            Self::OpenUrl { .. } => "open_url",
            Self::OpenConfigFile { .. } => "open_config_file",
            Self::SetPermissionMode { .. } => "set_permission_mode",
            Self::SetModel { .. } => "set_model",
            Self::SetThinkingLevel { .. } => "set_thinking_level",
            Self::ListSessions => "list_sessions_request",
            Self::GetSession { .. } => "get_session_request",
            Self::Exec { .. } => "exec",
            Self::ListFiles { .. } => "list_files_request",
            Self::StatPath { .. } => "stat_path_request",
        }
    }
}

/// Requests the host sends to the client surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingRequest {
    #[serde(rename_all = "camelCase")]
    ToolPermissionRequest {
        tool_name: String,
        inputs: Value,
        suggestions: Vec<Value>,
    },
    InsertAtMention {
        text: String,
    },
    SelectionChanged {
        selection: Value,
    },
    #[serde(rename_all = "camelCase")]
    VisibilityChanged {
        is_visible: bool,
    },
    UpdateState {
        state: HostState,
        config: Value,
    },
}

/// Response bodies for every incoming request, tagged the way the client
/// expects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestResponse {
    InitResponse {
        state: HostState,
    },
    GetClaudeStateResponse {
        config: Value,
    },
    #[serde(rename_all = "camelCase")]
    GetMcpServersResponse {
        mcp_servers: Vec<McpServerStatus>,
    },
    #[serde(rename = "asset_uris_response", rename_all = "camelCase")]
    AssetUrisResponse {
        asset_uris: Value,
    },
    OpenFileResponse,
    GetCurrentSelectionResponse {
        selection: Option<SelectionRange>,
    },
    #[serde(rename_all = "camelCase")]
    OpenDiffResponse {
        new_edits: Vec<TextEdit>,
    },
    #[serde(rename_all = "camelCase")]
    OpenContentResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_content: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ShowNotificationResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        button_value: Option<String>,
    },
    NewConversationTabResponse,
    RenameTabResponse,
    OpenUrlResponse,
    OpenConfigFileResponse,
    SetPermissionModeResponse {
        success: bool,
    },
    SetModelResponse {
        success: bool,
    },
    SetThinkingLevelResponse,
    ListSessionsResponse {
        sessions: Vec<SessionSummary>,
    },
    GetSessionResponse {
        messages: Vec<Value>,
    },
    #[serde(rename_all = "camelCase")]
    ExecResponse {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    ListFilesResponse {
        files: Vec<WorkspaceFileEntry>,
    },
    StatPathResponse {
        entries: Vec<PathStat>,
    },
}

impl RequestResponse {
    /// Serializes the response into a `response` envelope body.
    pub fn into_body(self) -> Result<Value> {
        serde_json::to_value(self).context("failed to encode request response body")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub old_string: String,
    pub new_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_all: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Host-side state snapshot handed to the client on `init` and
/// `update_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostState {
    pub default_cwd: String,
    pub open_new_in_tab: bool,
    pub model_setting: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerStatus {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRange {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
    pub selected_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub last_modified: u64,
    pub message_count: usize,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<String>,
    pub is_current_workspace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    File,
    Directory,
    Other,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStat {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: PathKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceFileEntry {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PathKind,
}
