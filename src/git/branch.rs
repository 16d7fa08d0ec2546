use serde::{Deserialize, Serialize};

/// Where a branch pulls from, as configured in git
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamInfo {
    /// Remote name, or "." when the upstream is another local branch
    pub remote: String,
    pub branch: String,
    pub full_name: String, // e.g., "origin/master" or "featureA/ss000"
}

impl UpstreamInfo {
    /// Build from the upstream ref git reports for a branch
    /// (`refs/remotes/origin/master` or `refs/heads/featureA/ss000`).
    pub fn from_refname(refname: &str) -> Option<Self> {
        if let Some(rest) = refname.strip_prefix("refs/remotes/") {
            let (remote, branch) = rest.split_once('/')?;
            Some(Self {
                remote: remote.to_string(),
                branch: branch.to_string(),
                full_name: rest.to_string(),
            })
        } else {
            refname.strip_prefix("refs/heads/").map(|branch| Self {
                remote: ".".to_string(),
                branch: branch.to_string(),
                full_name: branch.to_string(),
            })
        }
    }

    pub fn is_local(&self) -> bool {
        self.remote == "."
    }
}

/// Information about a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Short name: `featureA/ss001` locally, `origin/featureA/ss001` for remotes
    pub name: String,
    pub is_remote: bool,
    pub commit_hash: String,
    pub summary: String,
    pub upstream: Option<UpstreamInfo>,
}

impl BranchInfo {
    /// Name with the remote prefix removed (`origin/x` -> `x`).
    pub fn name_without_remote(&self, remote: &str) -> &str {
        if self.is_remote {
            strip_remote_prefix(&self.name, remote)
        } else {
            &self.name
        }
    }
}

/// `origin/master` -> `master`; names without the prefix pass through.
pub fn strip_remote_prefix<'a>(name: &'a str, remote: &str) -> &'a str {
    name.strip_prefix(remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
}
