use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;

use claudix_host::effective_workspace_dir;
use claudix_protocol::{PathKind, PathStat, RequestResponse, WorkspaceFileEntry};

use crate::dispatch::HandlerContext;

/// Directories never worth surfacing in a workspace file listing.
const EXCLUDED_DIR_NAMES: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    ".nuxt",
    "target",
];

const EXCLUDED_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db"];

const MAX_LIST_FILES_RESULTS: usize = 100;

/// Runs the command directly (no shell). A process that cannot even be
/// spawned is reported inside the response body, not as a request failure.
pub(crate) async fn handle_exec(
    context: &HandlerContext,
    command: &str,
    params: &[String],
) -> RequestResponse {
    let cwd = effective_workspace_dir(context.workspace.as_ref());
    let output = tokio::process::Command::new(command)
        .args(params)
        .current_dir(&cwd)
        .output()
        .await;

    match output {
        Ok(output) => RequestResponse::ExecResponse {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(0),
        },
        Err(error) => RequestResponse::ExecResponse {
            stdout: String::new(),
            stderr: error.to_string(),
            exit_code: 1,
        },
    }
}

pub(crate) async fn handle_list_files(
    context: &HandlerContext,
    pattern: Option<&str>,
) -> Result<RequestResponse> {
    let cwd = effective_workspace_dir(context.workspace.as_ref());
    let files = find_workspace_entries(&cwd, pattern).await?;
    Ok(RequestResponse::ListFilesResponse { files })
}

pub(crate) async fn handle_stat_path(
    context: &HandlerContext,
    paths: &[Value],
) -> RequestResponse {
    let cwd = effective_workspace_dir(context.workspace.as_ref());
    let mut entries = Vec::new();

    for raw in paths {
        let Some(path) = raw.as_str().filter(|path| !path.is_empty()) else {
            continue;
        };
        let absolute = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            cwd.join(path)
        };
        let kind = match tokio::fs::metadata(&absolute).await {
            Ok(metadata) if metadata.is_file() => PathKind::File,
            Ok(metadata) if metadata.is_dir() => PathKind::Directory,
            Ok(_) => PathKind::Other,
            Err(_) => PathKind::NotFound,
        };
        entries.push(PathStat {
            path: path.to_string(),
            kind,
        });
    }

    RequestResponse::StatPathResponse { entries }
}

/// Workspace walk with the fixed exclusion list, an optional
/// case-insensitive substring pattern, and a hard result cap. Results are
/// sorted by path, so traversal order does not leak into the response.
async fn find_workspace_entries(
    root: &Path,
    pattern: Option<&str>,
) -> Result<Vec<WorkspaceFileEntry>> {
    let needle = pattern.map(str::to_lowercase).filter(|p| !p.is_empty());
    let mut results = Vec::new();
    let mut queue = vec![root.to_path_buf()];

    while let Some(dir) = queue.pop() {
        if results.len() >= MAX_LIST_FILES_RESULTS {
            break;
        }
        let Ok(mut reader) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = reader.next_entry().await {
            if results.len() >= MAX_LIST_FILES_RESULTS {
                break;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };

            if file_type.is_dir() {
                if EXCLUDED_DIR_NAMES.contains(&name.as_str()) {
                    continue;
                }
                queue.push(entry.path());
                push_if_matching(
                    &mut results,
                    root,
                    &entry.path(),
                    &name,
                    PathKind::Directory,
                    needle.as_deref(),
                );
            } else if file_type.is_file() {
                if is_excluded_file(&name) {
                    continue;
                }
                push_if_matching(
                    &mut results,
                    root,
                    &entry.path(),
                    &name,
                    PathKind::File,
                    needle.as_deref(),
                );
            }
        }
    }

    results.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(results)
}

fn push_if_matching(
    results: &mut Vec<WorkspaceFileEntry>,
    root: &Path,
    path: &Path,
    name: &str,
    kind: PathKind,
    needle: Option<&str>,
) {
    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();
    if let Some(needle) = needle {
        if !relative.to_lowercase().contains(needle) {
            return;
        }
    }
    results.push(WorkspaceFileEntry {
        path: relative,
        name: name.to_string(),
        kind,
    });
}

fn is_excluded_file(name: &str) -> bool {
    EXCLUDED_FILE_NAMES.contains(&name)
        || name.ends_with(".log")
        || name == ".env"
        || name.starts_with(".env.")
}
