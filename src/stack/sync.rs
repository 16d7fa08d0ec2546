//! Keeping stack levels and their pull requests in step.

use super::events::StackEvent;
use super::manager::{DanglingWorkStatus, StackManager};
use super::selector::LevelSelector;
use super::stack::{Stack, StackLevel};
use crate::errors::{LadderError, Result};
use crate::git::{strip_remote_prefix, AncestryAnalyzer, CommitSummary, GitAccess};
use crate::review::{CreatePullRequestRequest, PullRequest, PullRequestPatch};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

const PLACEHOLDER_TITLE: &str = "[Please Edit This Title]";
const PLACEHOLDER_DESCRIPTION: &str =
    "The commits of this level could not be determined. Please describe the change.";

/// What `update_stack` did to one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelUpdate {
    pub number: u32,
    pub branch: String,
    /// `None` when the level was pushed but its unpushed commits were unknown
    pub pushed_commits: Option<usize>,
}

/// Fill the commit lists of `level` from git. Returns warnings for anything
/// that could not be determined; those lists stay `None`.
pub(crate) fn fill_commit_details(
    git: &dyn GitAccess,
    level: &mut StackLevel,
    max_rounds: usize,
) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    let local = git.get_branch(&level.local_branch)?.ok_or_else(|| {
        LadderError::domain(format!("Branch '{}' no longer exists.", level.local_branch))
    })?;
    level.recent_commit_summary = Some(local.summary.clone());

    let analyzer = AncestryAnalyzer::with_max_rounds(git, max_rounds);

    match git.get_branch(&level.tracking_branch)? {
        Some(tracking) => {
            let looking_back = analyzer.analyze(&tracking.commit_hash, &local.commit_hash)?;
            if looking_back.common_ancestor.is_none() {
                warnings.push(format!(
                    "Could not relate {} to {} within {} generations",
                    level.local_branch, level.tracking_branch, max_rounds
                ));
            }
            level.unpulled_commits = looking_back.commits_only_in_parent;
            level.all_commits = looking_back.commits_only_in_child;
        }
        None => warnings.push(format!(
            "Tracking branch {} of {} does not exist",
            level.tracking_branch, level.local_branch
        )),
    }

    match git.get_branch(&level.remote_target_branch)? {
        Some(remote) => {
            let looking_forward = analyzer.analyze(&local.commit_hash, &remote.commit_hash)?;
            if looking_forward.common_ancestor.is_none() {
                warnings.push(format!(
                    "Could not relate {} to {} within {} generations",
                    level.local_branch, level.remote_target_branch, max_rounds
                ));
            }
            level.unpushed_commits = looking_forward.commits_only_in_parent;
        }
        None => {
            // Never pushed: everything on the level is unpushed
            level.unpushed_commits = level.all_commits.clone();
        }
    }

    level.details_filled = true;
    Ok(warnings)
}

/// Description with each commit message appended on its own line, oldest first
fn append_commit_messages(description: &str, commits: &[CommitSummary]) -> String {
    let mut text = description.trim_end().to_string();
    for commit in commits.iter().rev() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&commit.short_message);
    }
    text
}

impl StackManager {
    /// The open pull request for `branch`. Lookup failures are reported and
    /// treated as "no pull request".
    async fn lookup_pull_request(&self, branch: &str) -> Option<PullRequest> {
        match self.review.get_pull_request_by_source_branch(branch).await {
            Ok(pr) => pr,
            Err(e) => {
                self.emit(StackEvent::warning(format!(
                    "Could not look up the pull request for {branch}: {e}"
                )));
                None
            }
        }
    }

    fn fill_commits(&self, level: &mut StackLevel) -> Result<()> {
        let warnings = fill_commit_details(
            self.git.as_ref(),
            level,
            self.settings.stack.ancestry_search_rounds,
        )?;
        for warning in warnings {
            self.emit(StackEvent::warning(warning));
        }
        Ok(())
    }

    /// A copy of `level` with commit lists and pull request filled in
    pub async fn level_details(&self, level: &StackLevel) -> Result<StackLevel> {
        let mut level = level.clone();
        self.fill_commits(&mut level)?;
        level.pull_request = self.lookup_pull_request(&level.local_branch).await;
        Ok(level)
    }

    fn current_level(&self) -> Result<(Stack, StackLevel)> {
        let stack = self.require_stack(None)?;
        let level = stack
            .current_level()
            .cloned()
            .ok_or_else(LadderError::not_on_stack)?;
        Ok((stack, level))
    }

    /// Push the current level. Messages of newly pushed commits are appended
    /// to the level's pull request description. Returns the pushed commits,
    /// or `None` when they could not be determined.
    pub async fn push_level(&self) -> Result<Option<Vec<CommitSummary>>> {
        if self.git.has_uncommitted_changes()? {
            return Err(LadderError::uncommitted_changes());
        }

        let (_, level) = self.current_level()?;
        let level = self.level_details(&level).await?;
        let unpushed = level.unpushed_commits.clone();

        match (&level.pull_request, &unpushed) {
            (Some(pr), Some(commits)) if !commits.is_empty() => {
                let patch = PullRequestPatch {
                    description: Some(append_commit_messages(&pr.description, commits)),
                    ..PullRequestPatch::default()
                };
                self.review.amend_pull_request(pr.id, patch).await?;
                self.emit(StackEvent::PullRequestAmended { id: pr.id });
            }
            (Some(pr), None) => {
                self.emit(StackEvent::warning(format!(
                    "Could not determine the unpushed commits of {}; the description of pull request {} was left as is.",
                    level.local_branch, pr.id
                )));
            }
            _ => {}
        }

        self.git.push(&level.local_branch)?;
        self.emit(StackEvent::BranchPushed {
            branch: level.local_branch.clone(),
        });
        Ok(unpushed)
    }

    /// Open a pull request for the current level.
    ///
    /// With `commit_description`, uncommitted work is committed and pushed
    /// first. Returns the existing pull request if the level already has one,
    /// and `None` when nothing on the level has been pushed.
    pub async fn create_pull_request(
        &self,
        commit_description: Option<&str>,
    ) -> Result<Option<PullRequest>> {
        let (stack, level) = self.current_level()?;
        let mut level = self.level_details(&level).await?;

        if let Some(pr) = level.pull_request.take() {
            self.emit(StackEvent::info(format!(
                "{} already has pull request {}: {}",
                level.local_branch, pr.id, pr.url
            )));
            return Ok(Some(pr));
        }

        let status = self.dangling_work_status()?;
        if status == DanglingWorkStatus::Clean && commit_description.is_some() {
            return Err(LadderError::domain(
                "A commit description was given, but there is no dangling work to commit.",
            ));
        }

        let prefix = format!("{}-{:03}", stack.name, level.number);
        let target = strip_remote_prefix(&level.tracking_branch, self.git.remote_name()).to_string();

        let (title, description) = if level.all_commits.is_none() {
            self.emit(StackEvent::warning(format!(
                "Could not determine the commits on {}. Please edit the pull request title and description.",
                level.local_branch
            )));
            (
                format!("{prefix} {PLACEHOLDER_TITLE}"),
                PLACEHOLDER_DESCRIPTION.to_string(),
            )
        } else {
            match (status, commit_description) {
                (DanglingWorkStatus::UncommittedChanges, Some(message)) => {
                    let id = self.git.commit_dangling_work(message)?;
                    debug!("Committed dangling work as {}", id);
                    self.emit(StackEvent::CommitCreated {
                        branch: level.local_branch.clone(),
                        message: message.to_string(),
                    });
                    self.push_level().await?;
                    level = self.level_details(&level).await?;
                }
                (DanglingWorkStatus::UncommittedChanges, None) => {
                    self.emit(StackEvent::warning(
                        "Uncommitted changes are not part of the pull request.",
                    ));
                }
                _ => {}
            }

            let pushed = level.pushed_commits().unwrap_or_default();
            let Some(first) = pushed.last() else {
                self.emit(StackEvent::error(format!(
                    "There is no work on the remote for {}. Push the level before creating a pull request.",
                    level.local_branch
                )));
                return Ok(None);
            };

            let title = format!("{prefix} {}", first.short_message);
            (title, append_commit_messages("", &pushed))
        };

        let pr = self
            .review
            .create_pull_request(CreatePullRequestRequest {
                source_branch: level.local_branch.clone(),
                target_branch: target,
                title,
                description,
            })
            .await?;
        self.emit(StackEvent::PullRequestCreated {
            id: pr.id,
            url: pr.url.clone(),
        });

        let refreshed = self.level_details(&level).await?;
        Ok(Some(refreshed.pull_request.unwrap_or(pr)))
    }

    pub async fn amend_pull_request(&self, id: i64, patch: PullRequestPatch) -> Result<PullRequest> {
        let pr = self.review.amend_pull_request(id, patch).await?;
        self.emit(StackEvent::PullRequestAmended { id });
        Ok(pr)
    }

    pub async fn abandon_pull_request(&self, id: i64) -> Result<PullRequest> {
        let pr = self.review.abandon_pull_request(id).await?;
        self.emit(StackEvent::PullRequestAbandoned { id });
        Ok(pr)
    }

    /// Abandon the pull request of the checked-out level, if it has one
    pub async fn abandon_current_pull_request(&self) -> Result<Option<PullRequest>> {
        let (_, level) = self.current_level()?;
        match self.lookup_pull_request(&level.local_branch).await {
            Some(pr) => Ok(Some(self.abandon_pull_request(pr.id).await?)),
            None => {
                self.emit(StackEvent::info(format!(
                    "{} has no open pull request",
                    level.local_branch
                )));
                Ok(None)
            }
        }
    }

    /// A stack with commit details and pull requests filled in, for all
    /// levels or just the selected one. Pull request lookups run concurrently.
    pub async fn stack_status(
        &self,
        stack_name: Option<&str>,
        selector: Option<LevelSelector>,
    ) -> Result<Stack> {
        let mut stack = self.require_stack(stack_name)?;

        let selected: Vec<StackLevel> = match selector {
            None => stack.levels.values().cloned().collect(),
            Some(selector) => vec![stack.select_level(selector.to_index())?.clone()],
        };

        let filled: Arc<Mutex<BTreeMap<u32, StackLevel>>> = Arc::new(Mutex::new(BTreeMap::new()));
        let mut lookups = JoinSet::new();
        for mut level in selected {
            self.fill_commits(&mut level)?;

            let review = Arc::clone(&self.review);
            let filled = Arc::clone(&filled);
            lookups.spawn(async move {
                let failure = match review
                    .get_pull_request_by_source_branch(&level.local_branch)
                    .await
                {
                    Ok(pr) => {
                        level.pull_request = pr;
                        None
                    }
                    Err(e) => Some(format!(
                        "Could not look up the pull request for {}: {}",
                        level.local_branch, e
                    )),
                };
                filled.lock().await.insert(level.number, level);
                failure
            });
        }

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok(Some(failure)) => self.emit(StackEvent::warning(failure)),
                Ok(None) => {}
                Err(e) => warn!("Pull request lookup task failed: {}", e),
            }
        }

        for (_, level) in std::mem::take(&mut *filled.lock().await) {
            stack.replace_level(level);
        }
        Ok(stack)
    }

    /// Bring levels `start..=stop` (level numbers; defaults are the first
    /// working level and the checked-out level) up to date: each level is
    /// pulled when it is behind its tracking branch and pushed when it has
    /// unpushed commits. The original level is checked out again afterwards.
    pub async fn update_stack(
        &self,
        start: Option<u32>,
        stop: Option<u32>,
    ) -> Result<Vec<LevelUpdate>> {
        if self.git.has_uncommitted_changes()? {
            return Err(LadderError::uncommitted_changes());
        }

        let (stack, original) = self.current_level()?;
        let start = start.unwrap_or(1);
        let stop = stop.unwrap_or(original.number);
        let levels: Vec<StackLevel> = stack
            .levels
            .values()
            .filter(|level| level.number >= start && level.number <= stop)
            .cloned()
            .collect();

        let mut updates = Vec::new();
        let mut outcome = Ok(());
        for level in levels {
            let step = async {
                self.checkout(&level.local_branch)?;
                let mut level = level.clone();
                self.fill_commits(&mut level)?;

                if level.unpulled_commits.as_ref().is_some_and(|c| !c.is_empty()) {
                    self.git.pull()?;
                    self.emit(StackEvent::BranchPulled {
                        branch: level.local_branch.clone(),
                    });
                    self.fill_commits(&mut level)?;
                }

                match &level.unpushed_commits {
                    Some(commits) if commits.is_empty() => {
                        debug!("{} is up to date with the remote", level.local_branch);
                        Ok(Some(Vec::new()))
                    }
                    _ => self.push_level().await,
                }
            };
            match step.await {
                Ok(pushed) => updates.push(LevelUpdate {
                    number: level.number,
                    branch: level.local_branch.clone(),
                    pushed_commits: pushed.map(|commits| commits.len()),
                }),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        if let Err(e) = self.checkout(&original.local_branch) {
            self.emit(StackEvent::error(format!(
                "Could not return to {}: {}",
                original.local_branch, e
            )));
        }

        outcome.map(|_| updates)
    }
}
