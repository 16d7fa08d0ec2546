//! Rebuild stacks from the branch list.
//!
//! Stacks are never stored: every query decodes the local branch names and
//! groups them. Running discovery twice over the same branches gives the same
//! result.

use super::naming;
use super::stack::{StackLevel, StackSet};
use crate::git::BranchInfo;
use std::fmt;
use std::path::{Path, PathBuf};

/// Repository facts shared by every discovered stack
#[derive(Debug, Clone)]
pub struct RepositoryContext {
    pub remote_name: String,
    pub repository_url: String,
    pub root_path: PathBuf,
}

/// Something odd found while grouping branches. Discovery carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryWarning {
    MissingUpstream { branch: String },
    DuplicateLevel { branch: String },
    LevelGap { stack: String, missing: Vec<u32> },
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryWarning::MissingUpstream { branch } => write!(
                f,
                "Skipping {branch}: level 0 branches must track their origin branch"
            ),
            DiscoveryWarning::DuplicateLevel { branch } => {
                write!(f, "Skipping {branch}: another branch already holds this level")
            }
            DiscoveryWarning::LevelGap { stack, missing } => {
                let missing: Vec<String> = missing.iter().map(u32::to_string).collect();
                write!(f, "Stack {stack} is missing level(s) {}", missing.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub stacks: StackSet,
    pub warnings: Vec<DiscoveryWarning>,
}

/// Group `branches` into stacks and mark the level matching `current_branch`.
pub fn discover(
    branches: &[BranchInfo],
    current_branch: Option<&str>,
    context: &RepositoryContext,
) -> Discovery {
    let mut discovery = Discovery::default();

    for branch in branches.iter().filter(|branch| !branch.is_remote) {
        let Some(decoded) = naming::decode(&branch.name) else {
            continue;
        };

        let tracking = if decoded.level == 0 {
            match &branch.upstream {
                Some(upstream) => upstream.full_name.clone(),
                None => {
                    discovery.warnings.push(DiscoveryWarning::MissingUpstream {
                        branch: branch.name.clone(),
                    });
                    continue;
                }
            }
        } else {
            naming::encode(&decoded.stack_name, decoded.level - 1)
        };

        let mut level = StackLevel::new(
            &decoded.stack_name,
            decoded.level,
            &tracking,
            &context.remote_name,
        );
        // Keep the branch's own spelling
        level.local_branch = branch.name.clone();
        level.remote_target_branch = format!("{}/{}", context.remote_name, branch.name);
        level.recent_commit_summary = Some(branch.summary.clone());
        level.is_current = current_branch == Some(branch.name.as_str());

        let stack = discovery.stacks.entry(
            &decoded.stack_name,
            &context.repository_url,
            &context.root_path,
        );
        level.stack_name = stack.name.clone();
        if stack.add_level(level).is_err() {
            discovery.warnings.push(DiscoveryWarning::DuplicateLevel {
                branch: branch.name.clone(),
            });
        }
    }

    for stack in discovery.stacks.iter() {
        let missing = stack.level_gaps();
        if !missing.is_empty() {
            discovery.warnings.push(DiscoveryWarning::LevelGap {
                stack: stack.name.clone(),
                missing,
            });
        }
    }

    discovery
}

impl RepositoryContext {
    pub fn new(remote_name: &str, repository_url: &str, root_path: &Path) -> Self {
        Self {
            remote_name: remote_name.to_string(),
            repository_url: repository_url.to_string(),
            root_path: root_path.to_path_buf(),
        }
    }
}
