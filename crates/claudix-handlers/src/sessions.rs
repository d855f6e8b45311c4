use claudix_host::effective_workspace_dir;
use claudix_protocol::RequestResponse;

use crate::dispatch::HandlerContext;

/// A broken session store degrades to an empty listing; history browsing
/// must not take the conversation surface down with it.
pub(crate) async fn handle_list_sessions(context: &HandlerContext) -> RequestResponse {
    let cwd = effective_workspace_dir(context.workspace.as_ref());
    let sessions = match context.sessions.list_sessions(cwd).await {
        Ok(sessions) => sessions,
        Err(error) => {
            tracing::error!(error = %error, "failed to list sessions");
            Vec::new()
        }
    };
    RequestResponse::ListSessionsResponse { sessions }
}

pub(crate) async fn handle_get_session(
    context: &HandlerContext,
    session_id: String,
) -> RequestResponse {
    let cwd = effective_workspace_dir(context.workspace.as_ref());
    let messages = match context.sessions.session_messages(session_id, cwd).await {
        Ok(messages) => messages,
        Err(error) => {
            tracing::error!(error = %error, "failed to load session");
            Vec::new()
        }
    };
    RequestResponse::GetSessionResponse { messages }
}
