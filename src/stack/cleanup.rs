use super::events::StackEvent;
use super::manager::StackManager;
use super::naming;
use super::stack::Stack;
use crate::errors::Result;
use crate::git::strip_remote_prefix;
use serde::Serialize;
use tracing::{info, warn};

/// Result of purging a stack
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurgeResult {
    /// Pull requests that were abandoned
    pub abandoned_pull_requests: Vec<i64>,
    /// Branches that were deleted
    pub deleted_branches: Vec<String>,
    /// Items that could not be cleaned up
    pub failed: Vec<(String, String)>, // (item, error)
}

impl PurgeResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl StackManager {
    /// Branches belonging to `stack_name`: local ones first, then
    /// remote-tracking ones when asked for, each group sorted.
    pub fn branch_names(&self, stack_name: &str, include_remote: bool) -> Result<Vec<String>> {
        let mut local: Vec<String> = self
            .git
            .local_branches()?
            .into_iter()
            .filter(|branch| naming::level_in_stack(&branch.name, stack_name).is_some())
            .map(|branch| branch.name)
            .collect();
        local.sort();

        if include_remote {
            let remote_name = self.git.remote_name().to_string();
            let mut remote: Vec<String> = self
                .git
                .origin_branches()?
                .into_iter()
                .filter(|branch| {
                    naming::level_in_stack(branch.name_without_remote(&remote_name), stack_name)
                        .is_some()
                })
                .map(|branch| branch.name)
                .collect();
            remote.sort();
            local.extend(remote);
        }

        Ok(local)
    }

    /// Where to stand while a stack's branches are deleted: the branch level
    /// 0 was created from, or the default branch.
    fn safe_branch(&self, stack: &Stack) -> String {
        stack
            .level(0)
            .map(|level| strip_remote_prefix(&level.tracking_branch, self.git.remote_name()))
            .unwrap_or(self.settings.git.default_branch.as_str())
            .to_string()
    }

    fn leave_stack(&self, stack: &Stack) -> Result<()> {
        let safe = self.safe_branch(stack);
        if self.git.get_branch(&safe)?.filter(|b| !b.is_remote).is_none() {
            let remote_safe = format!("{}/{}", self.git.remote_name(), safe);
            self.git.create_branch(&safe, &remote_safe)?;
        }
        self.checkout(&safe)
    }

    /// Remove a stack: abandon its open pull requests and delete its
    /// branches. Individual failures are collected and the purge carries on.
    pub async fn purge_stack(&self, stack_name: &str, include_remote: bool) -> Result<PurgeResult> {
        let mut result = PurgeResult::default();

        match self.stack(stack_name)? {
            Some(stack) => {
                if stack.is_current() {
                    if let Err(e) = self.leave_stack(&stack) {
                        warn!("Could not leave stack '{}': {}", stack.name, e);
                        self.emit(StackEvent::error(format!(
                            "Could not check out a branch outside the stack: {e}"
                        )));
                    }
                }

                for level in stack.levels.values() {
                    match self
                        .review
                        .get_pull_request_by_source_branch(&level.local_branch)
                        .await
                    {
                        Ok(Some(pr)) if !pr.status.is_terminal() => {
                            match self.abandon_pull_request(pr.id).await {
                                Ok(_) => result.abandoned_pull_requests.push(pr.id),
                                Err(e) => {
                                    self.emit(StackEvent::error(format!(
                                        "Could not abandon pull request {}: {}",
                                        pr.id, e
                                    )));
                                    result
                                        .failed
                                        .push((format!("pull request {}", pr.id), e.to_string()));
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            self.emit(StackEvent::warning(format!(
                                "Could not look up the pull request for {}: {}",
                                level.local_branch, e
                            )));
                            result.failed.push((level.local_branch.clone(), e.to_string()));
                        }
                    }
                }
            }
            None => self.emit(StackEvent::warning(format!(
                "No stack named '{stack_name}' was found; deleting matching branches only."
            ))),
        }

        let branches = self.branch_names(stack_name, include_remote)?;
        info!("Deleting {} branches of '{}'", branches.len(), stack_name);
        for branch in branches {
            match self.git.delete_branch(&branch) {
                Ok(()) => {
                    self.emit(StackEvent::BranchDeleted {
                        branch: branch.clone(),
                    });
                    result.deleted_branches.push(branch);
                }
                Err(e) => {
                    self.emit(StackEvent::error(format!(
                        "Could not delete {branch}: {e}"
                    )));
                    result.failed.push((branch, e.to_string()));
                }
            }
        }

        Ok(result)
    }
}
