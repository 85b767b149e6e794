//! Reads the trigger commit and branch from a local checkout.
//!
//! Used when a run is started by hand instead of by a push event.

use std::path::Path;
use std::process::Command;

use rollout_core::ReleaseEvent;

/// Capture the checked-out branch and `HEAD` commit as a release event.
pub fn head_event(project_dir: &Path) -> Result<ReleaseEvent, GitError> {
    let branch = git(project_dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if branch == "HEAD" {
        return Err(GitError::DetachedHead);
    }
    let commit = git(project_dir, &["rev-parse", "HEAD"])?;

    ReleaseEvent::new(&branch, &commit).map_err(|e| GitError::InvalidEvent { source: e })
}

/// Checks whether the git working tree has uncommitted changes.
pub fn is_dirty(project_dir: &Path) -> Result<bool, GitError> {
    let status = git(project_dir, &["status", "--porcelain"])?;
    Ok(!status.is_empty())
}

fn git(project_dir: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(project_dir)
        .output()
        .map_err(|e| GitError::GitCommand {
            detail: format!("failed to execute git {}", args.join(" ")),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::GitFailed {
            detail: format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git command failed: {detail}")]
    GitCommand {
        detail: String,
        source: std::io::Error,
    },
    #[error("git failed: {detail}")]
    GitFailed { detail: String },
    #[error("HEAD is detached — pass --branch explicitly")]
    DetachedHead,
    #[error("checkout does not describe a valid release event")]
    InvalidEvent { source: rollout_core::Error },
}
