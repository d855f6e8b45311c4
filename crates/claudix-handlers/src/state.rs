use anyhow::Result;

use claudix_host::effective_workspace_dir;
use claudix_protocol::{HostState, RequestResponse, ThinkingLevel};

use crate::dispatch::HandlerContext;

/// Until a tab-management setting exists, new conversations reuse the
/// current view.
const OPEN_NEW_IN_TAB: bool = false;

const DEFAULT_MODEL_SETTING: &str = "default";

pub(crate) fn handle_init(context: &HandlerContext, thinking_level: ThinkingLevel) -> RequestResponse {
    let model_setting = context
        .config
        .selected_model()
        .unwrap_or_else(|| DEFAULT_MODEL_SETTING.to_string());
    let default_cwd = effective_workspace_dir(context.workspace.as_ref())
        .to_string_lossy()
        .into_owned();

    RequestResponse::InitResponse {
        state: HostState {
            default_cwd,
            open_new_in_tab: OPEN_NEW_IN_TAB,
            model_setting,
            platform: platform_name().to_string(),
            thinking_level: Some(thinking_level),
        },
    }
}

pub(crate) async fn handle_get_claude_state(context: &HandlerContext) -> Result<RequestResponse> {
    let config = context.agent_config.claude_config().await?;
    Ok(RequestResponse::GetClaudeStateResponse { config })
}

pub(crate) async fn handle_get_mcp_servers(
    context: &HandlerContext,
    channel_id: Option<String>,
) -> Result<RequestResponse> {
    let mcp_servers = context.mcp.servers(channel_id).await?;
    Ok(RequestResponse::GetMcpServersResponse { mcp_servers })
}

pub(crate) fn handle_get_asset_uris(context: &HandlerContext) -> RequestResponse {
    RequestResponse::AssetUrisResponse {
        asset_uris: context.assets.asset_uris(),
    }
}

/// The client expects node-style platform names.
pub(crate) fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}
