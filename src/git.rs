//! Shallow checkouts of target branches, used to read pre-change file contents.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Component, Path};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::diff::{files_needing_base_contents, FileDiffStat, FileStatus};

/// Pre-change contents of one file touched by a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseFile {
    pub file: String,
    pub status: FileStatus,
    /// `None` when the file is missing from the checkout or is not UTF-8
    pub contents: Option<String>,
}

pub async fn run_git_command(working_dir: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut command = Command::new("git");
    // Disable C-quoting of non-ASCII paths to get raw UTF-8 output
    command.args(["-c", "core.quotePath=false"]);
    command.args(args);

    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .context("failed to spawn git command")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Make `dest` a depth-1 checkout of `branch` from `clone_url`.
///
/// An existing checkout is refreshed in place.
pub async fn sync_clone(clone_url: &str, branch: &str, dest: &Path) -> Result<()> {
    if dest.join(".git").exists() {
        debug!(dest = %dest.display(), branch, "refreshing checkout");
        run_git_command(Some(dest), &["fetch", "--depth", "1", "origin", branch]).await?;
        run_git_command(Some(dest), &["reset", "--hard", "FETCH_HEAD"]).await?;
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let dest_str = dest
        .to_str()
        .with_context(|| format!("Non UTF-8 checkout path: {}", dest.display()))?;

    info!(%clone_url, branch, "cloning");
    run_git_command(
        None,
        &["clone", "--depth", "1", "--branch", branch, clone_url, dest_str],
    )
    .await?;
    Ok(())
}

/// Relative paths that stay inside the checkout.
fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Read the pre-change contents of every non-new file in `stats`.
pub async fn base_file_contents(checkout: &Path, stats: &[FileDiffStat]) -> Result<Vec<BaseFile>> {
    let mut files = Vec::new();
    for stat in files_needing_base_contents(stats) {
        if !is_safe_relative(&stat.file) {
            warn!(file = %stat.file, "skipping path outside the checkout");
            continue;
        }

        let contents = match tokio::fs::read_to_string(checkout.join(&stat.file)).await {
            Ok(contents) => Some(contents),
            Err(e) => {
                warn!(file = %stat.file, "cannot read base file: {}", e);
                None
            }
        };
        files.push(BaseFile {
            file: stat.file.clone(),
            status: stat.status,
            contents,
        });
    }
    Ok(files)
}
