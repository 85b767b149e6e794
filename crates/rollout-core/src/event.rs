//! Release events and the branch filter that admits them.

use std::fmt;

/// Length of the abbreviated commit hash used as the immutable release tag.
pub const SHORT_COMMIT_LEN: usize = 7;

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// The push that triggered a pipeline run.
///
/// Immutable once captured: fields are private and only readable.
///
/// # Examples
///
/// ```
/// use rollout_core::ReleaseEvent;
///
/// let event = ReleaseEvent::new("refs/heads/master", "abc1234def5678").unwrap();
/// assert_eq!(event.branch(), "master");
/// assert_eq!(event.short_commit(), "abc1234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEvent {
    branch: String,
    commit: String,
    short_commit: String,
}

impl ReleaseEvent {
    /// Capture an event from a branch (plain name or full `refs/heads/` ref)
    /// and a full commit hash.
    pub fn new(branch: &str, commit: &str) -> crate::Result<Self> {
        let branch = branch.trim();
        let branch = branch.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(branch);
        if branch.is_empty() {
            return Err(crate::Error::EmptyBranch);
        }

        let commit = commit.trim().to_ascii_lowercase();
        if commit.len() < SHORT_COMMIT_LEN || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidCommit { commit });
        }

        let short_commit = commit[..SHORT_COMMIT_LEN].to_owned();

        Ok(Self {
            branch: branch.to_owned(),
            commit,
            short_commit,
        })
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn short_commit(&self) -> &str {
        &self.short_commit
    }
}

impl fmt::Display for ReleaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.branch, self.short_commit)
    }
}

/// Admits only events pushed to exactly one configured branch.
#[derive(Debug, Clone)]
pub struct TriggerGate {
    branch: String,
}

impl TriggerGate {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Exact comparison; no glob or prefix semantics.
    pub fn admits(&self, event: &ReleaseEvent) -> bool {
        event.branch() == self.branch
    }
}
