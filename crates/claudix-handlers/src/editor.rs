use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tokio_util::sync::CancellationToken;

use claudix_host::effective_workspace_dir;
use claudix_protocol::{FileLocation, NotificationSeverity, RequestResponse, TextEdit};

use crate::dispatch::HandlerContext;

pub(crate) async fn handle_open_file(
    context: &HandlerContext,
    file_path: &str,
    location: Option<FileLocation>,
) -> Result<RequestResponse> {
    let resolved = resolve_existing_path(context, file_path).await?;
    context
        .editor
        .open_file(resolved, location)
        .await
        .map_err(|error| anyhow!("Failed to open file: {error}"))?;
    Ok(RequestResponse::OpenFileResponse)
}

pub(crate) async fn handle_get_current_selection(context: &HandlerContext) -> RequestResponse {
    RequestResponse::GetCurrentSelectionResponse {
        selection: context.editor.current_selection().await,
    }
}

pub(crate) async fn handle_open_diff(
    context: &HandlerContext,
    original_file_path: &str,
    new_file_path: Option<String>,
    edits: Vec<TextEdit>,
    cancel: CancellationToken,
) -> Result<RequestResponse> {
    // A caller that already gave up gets its edits back unchanged.
    if cancel.is_cancelled() {
        return Ok(RequestResponse::OpenDiffResponse { new_edits: edits });
    }

    let cwd = effective_workspace_dir(context.workspace.as_ref());
    let original = resolve_file_path(original_file_path, &cwd);
    let new_path = new_file_path.map(|path| resolve_file_path(&path, &cwd));

    let new_edits = context
        .editor
        .open_diff(original, new_path, edits, cancel)
        .await?;
    Ok(RequestResponse::OpenDiffResponse { new_edits })
}

pub(crate) async fn handle_open_content(
    context: &HandlerContext,
    content: String,
    file_name: String,
    editable: bool,
    cancel: CancellationToken,
) -> Result<RequestResponse> {
    let updated_content = context
        .editor
        .open_content(content, file_name, editable, cancel)
        .await?;
    Ok(RequestResponse::OpenContentResponse { updated_content })
}

pub(crate) async fn handle_show_notification(
    context: &HandlerContext,
    message: String,
    severity: NotificationSeverity,
    buttons: Vec<String>,
    only_if_not_visible: bool,
) -> Result<RequestResponse> {
    let button_value = context
        .notifications
        .show(message, severity, buttons, only_if_not_visible)
        .await?;
    Ok(RequestResponse::ShowNotificationResponse { button_value })
}

/// Focus failures are logged, not surfaced; the tab request itself
/// succeeded.
pub(crate) async fn handle_new_conversation_tab(context: &HandlerContext) -> RequestResponse {
    if let Err(error) = context.editor.focus_conversation_view().await {
        tracing::warn!(error = %error, "failed to focus conversation view");
    }
    RequestResponse::NewConversationTabResponse
}

pub(crate) async fn handle_open_url(
    context: &HandlerContext,
    url: String,
) -> Result<RequestResponse> {
    context.editor.open_url(url).await?;
    Ok(RequestResponse::OpenUrlResponse)
}

pub(crate) async fn handle_open_config_file(
    context: &HandlerContext,
    config_type: String,
) -> Result<RequestResponse> {
    context.editor.open_config_file(config_type).await?;
    Ok(RequestResponse::OpenConfigFileResponse)
}

/// Workspace-relative first, then as given; the file must exist.
async fn resolve_existing_path(context: &HandlerContext, file_path: &str) -> Result<PathBuf> {
    let cwd = effective_workspace_dir(context.workspace.as_ref());
    let candidate = resolve_file_path(file_path, &cwd);
    if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return Ok(candidate);
    }
    let given = PathBuf::from(file_path);
    if given.is_absolute() && tokio::fs::try_exists(&given).await.unwrap_or(false) {
        return Ok(given);
    }
    bail!("File not found: {file_path}")
}

fn resolve_file_path(file_path: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(file_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
