use std::path::PathBuf;

/// Source of the default working directory for launches and the
/// filesystem-facing request handlers.
pub trait WorkspaceSurface: Send + Sync {
    fn default_workspace_dir(&self) -> Option<PathBuf>;
}

/// Resolves the effective working directory: the workspace default, or the
/// process cwd when no workspace is open.
pub fn effective_workspace_dir(workspace: &dyn WorkspaceSurface) -> PathBuf {
    workspace
        .default_workspace_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
