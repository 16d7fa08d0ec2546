pub mod ancestry;
pub mod branch;
pub mod repository;

pub use ancestry::{
    AncestryAnalyzer, CommitAncestryResult, CommitGraph, CommitNode, CommitSummary,
};
pub use branch::{strip_remote_prefix, BranchInfo, UpstreamInfo};
pub use repository::GitRepository;

use crate::errors::{LadderError, Result};
use std::path::Path;

/// Everything the stack engine needs from a working copy.
///
/// Branch lookups by name are case-insensitive. Remote-tracking branches are
/// addressed as `<remote>/<branch>`.
pub trait GitAccess: CommitGraph + Send + Sync {
    /// Checked-out branch, `None` on a detached HEAD
    fn current_branch(&self) -> Result<Option<String>>;

    fn local_branches(&self) -> Result<Vec<BranchInfo>>;

    /// Remote-tracking branches of the configured remote
    fn origin_branches(&self) -> Result<Vec<BranchInfo>>;

    fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Whether HEAD is ahead of its configured upstream
    fn has_unpushed_commits(&self) -> Result<bool>;

    fn get_branch(&self, name: &str) -> Result<Option<BranchInfo>>;

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_branch(name)?.is_some())
    }

    /// Create `new_branch` at the tip of `track` and make `track` its upstream
    fn create_branch(&self, new_branch: &str, track: &str) -> Result<()>;

    fn checkout(&self, name: &str) -> Result<()>;

    fn push(&self, name: &str) -> Result<()>;

    /// Fetch, then bring the current branch up to date with its upstream
    fn pull(&self) -> Result<()>;

    fn fetch(&self) -> Result<()>;

    /// Delete a local branch, or a remote one when given as `<remote>/<branch>`
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Stage everything and commit it on the current branch; returns the new commit id
    fn commit_dangling_work(&self, description: &str) -> Result<String>;

    fn remote_name(&self) -> &str;

    fn remote_url(&self) -> Result<String>;

    fn root_path(&self) -> &Path;
}

/// Find the root of the Git repository
pub fn find_repository_root(start_path: &Path) -> Result<std::path::PathBuf> {
    let repo = git2::Repository::discover(start_path).map_err(LadderError::Git)?;

    let workdir = repo
        .workdir()
        .ok_or_else(|| LadderError::config("Repository has no working directory (bare repo?)"))?;

    Ok(workdir.to_path_buf())
}
