//! Read-only version-control status for book roots
//!
//! Committing and pushing stay outside gtbook. The registry only asks an
//! injected [`VersionControl`] for a short status line per book.

use std::fmt;
use std::path::Path;
use std::process::Command;

use serde::Serialize;

/// Pending work in the repository containing a book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    /// Files with staged or unstaged changes
    pub changed: usize,
    /// Local commits not yet on the upstream branch
    pub ahead: usize,
}

impl RepoStatus {
    pub fn is_clean(&self) -> bool {
        self.changed == 0 && self.ahead == 0
    }

    /// Human summary, e.g. `2 files changed, 1 unpushed commit`
    ///
    /// Empty when there is nothing pending.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.changed > 0 {
            parts.push(format!("{} files changed", self.changed));
        }
        if self.ahead > 0 {
            let plural = if self.ahead == 1 { "" } else { "s" };
            parts.push(format!("{} unpushed commit{}", self.ahead, plural));
        }
        parts.join(", ")
    }
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Source of repository status for a book root
pub trait VersionControl: fmt::Debug + Send + Sync {
    /// Returns `None` when the root is not inside a repository
    fn status(&self, root: &Path) -> Option<RepoStatus>;
}

/// [`VersionControl`] backed by the `git` executable
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn run(root: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .ok()?;

        if !output.status.success() {
            tracing::debug!(
                root = %root.display(),
                ?args,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git command failed"
            );
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for GitCli {
    fn status(&self, root: &Path) -> Option<RepoStatus> {
        let porcelain = Self::run(root, &["status", "--porcelain"])?;
        let changed = count_changed(&porcelain);

        // No upstream configured is not an error; there is just nothing to push.
        let ahead = Self::run(root, &["rev-list", "--count", "@{u}..HEAD"])
            .and_then(|out| out.trim().parse().ok())
            .unwrap_or(0);

        Some(RepoStatus { changed, ahead })
    }
}

fn count_changed(porcelain: &str) -> usize {
    porcelain.lines().filter(|line| !line.trim().is_empty()).count()
}
