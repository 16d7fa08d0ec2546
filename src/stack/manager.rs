use super::events::{EventSink, StackEvent};
use super::naming::{self, MAX_LEVEL};
use super::stack::{Stack, StackLevel, StackSet};
use super::topology::{self, RepositoryContext};
use crate::config::{self, Settings};
use crate::errors::{LadderError, Result};
use crate::git::{self, strip_remote_prefix, GitAccess, GitRepository};
use crate::review::{self, ReviewService};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// State of the working copy relative to the checked-out level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DanglingWorkStatus {
    Clean,
    UncommittedChanges,
    UnpushedCommits,
}

/// Runs stack operations against one repository.
///
/// Nothing is cached between calls: every operation rediscovers the stacks
/// from the branch list, so the checked-out branch is always the source of
/// truth for which level is current.
pub struct StackManager {
    pub(crate) git: Arc<dyn GitAccess>,
    pub(crate) review: Arc<dyn ReviewService>,
    pub(crate) settings: Settings,
    events: Option<EventSink>,
}

impl StackManager {
    pub fn new(git: Arc<dyn GitAccess>, review: Arc<dyn ReviewService>, settings: Settings) -> Self {
        Self {
            git,
            review,
            settings,
            events: None,
        }
    }

    /// Open the repository containing `path` with its saved settings
    pub fn open(path: &Path) -> Result<Self> {
        let root = git::find_repository_root(path)?;
        let settings = config::load_repo_settings(&root)?;
        let repo = GitRepository::open_with_remote(&root, &settings.git.remote_name)?;
        let remote_url = repo.remote_url().unwrap_or_default();
        let review = review::create_review_service(&settings.review, &remote_url);

        Ok(Self::new(Arc::new(repo), review, settings))
    }

    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn git(&self) -> &dyn GitAccess {
        self.git.as_ref()
    }

    pub(crate) fn emit(&self, event: StackEvent) {
        event.log();
        if let Some(sink) = &self.events {
            sink(&event);
        }
    }

    fn context(&self) -> RepositoryContext {
        RepositoryContext::new(
            self.git.remote_name(),
            &self.git.remote_url().unwrap_or_default(),
            self.git.root_path(),
        )
    }

    /// All stacks in the repository
    pub fn stacks(&self) -> Result<StackSet> {
        let branches = self.git.local_branches()?;
        let current = self.git.current_branch()?;
        let discovery = topology::discover(&branches, current.as_deref(), &self.context());
        for warning in &discovery.warnings {
            self.emit(StackEvent::warning(warning.to_string()));
        }
        Ok(discovery.stacks)
    }

    pub fn stack(&self, name: &str) -> Result<Option<Stack>> {
        Ok(self.stacks()?.get(name).cloned())
    }

    /// The stack whose level is checked out, if any
    pub fn current_stack(&self) -> Result<Option<Stack>> {
        Ok(self.stacks()?.current().cloned())
    }

    /// The named stack, or the current one when no name is given
    pub(crate) fn require_stack(&self, name: Option<&str>) -> Result<Stack> {
        match name {
            Some(name) => self.stack(name)?.ok_or_else(|| {
                LadderError::domain(format!(
                    "There is no stack named '{name}'. Use 'ladder list' to see available stacks."
                ))
            }),
            None => self.current_stack()?.ok_or_else(LadderError::not_on_stack),
        }
    }

    pub fn dangling_work_status(&self) -> Result<DanglingWorkStatus> {
        if self.git.has_uncommitted_changes()? {
            Ok(DanglingWorkStatus::UncommittedChanges)
        } else if self.git.has_unpushed_commits()? {
            Ok(DanglingWorkStatus::UnpushedCommits)
        } else {
            Ok(DanglingWorkStatus::Clean)
        }
    }

    /// Start a new stack, or add a level to an existing one.
    ///
    /// With no name the current stack grows by one level, which requires
    /// committed work on the current level. A new stack gets a level 0 on top
    /// of `origin` (the default branch when not given) and a first working
    /// level above it. Returns the new current level.
    pub fn create_stack(&self, name: Option<&str>, origin: Option<&str>) -> Result<StackLevel> {
        if self.git.has_uncommitted_changes()? {
            return Err(LadderError::uncommitted_changes());
        }

        let Some(name) = name else {
            let stack = self.current_stack()?.ok_or_else(LadderError::not_on_stack)?;
            if self.dangling_work_status()? == DanglingWorkStatus::Clean {
                return Err(LadderError::domain(
                    "There are no commits on the current level. Commit some work before adding a level.",
                ));
            }
            return self.add_level(&stack, origin);
        };

        if !naming::is_valid_stack_name(name) {
            return Err(LadderError::domain(format!(
                "'{name}' is not a valid stack name."
            )));
        }

        if let Some(stack) = self.stack(name)? {
            return self.add_level(&stack, origin);
        }

        let remote = self.git.remote_name().to_string();
        let origin = origin.unwrap_or(self.settings.git.default_branch.as_str());
        let origin = strip_remote_prefix(origin, &remote).to_string();

        if let Err(e) = self.git.fetch() {
            self.emit(StackEvent::warning(format!(
                "Could not fetch from {remote}, using the last known state: {e}"
            )));
        }

        let remote_origin = format!("{remote}/{origin}");
        let origin_exists = self
            .git
            .get_branch(&remote_origin)?
            .map(|branch| branch.is_remote)
            .unwrap_or(false);
        if !origin_exists {
            return Err(LadderError::domain(format!(
                "The origin branch '{origin}' does not exist on {}.",
                self.git.remote_url().unwrap_or(remote)
            )));
        }

        info!("Creating stack '{}' on top of '{}'", name, remote_origin);
        let empty = Stack::new(name, "", self.git.root_path().to_path_buf());
        self.add_level(&empty, Some(&origin))?;
        self.git.pull()?;
        self.emit(StackEvent::BranchPulled {
            branch: naming::encode(name, 0),
        });

        let stack = self.require_stack(Some(name))?;
        self.add_level(&stack, None)
    }

    /// Append a level to `stack` and check it out.
    ///
    /// The new level tracks the current top level. Only the first level of a
    /// stack may name its own origin.
    pub fn add_level(&self, stack: &Stack, origin: Option<&str>) -> Result<StackLevel> {
        if self.git.has_uncommitted_changes()? {
            return Err(LadderError::uncommitted_changes());
        }

        let last = stack.last_level();
        if origin.is_some() && last.is_some() {
            return Err(LadderError::domain(
                "The origin can only be specified for zero-level branches.",
            ));
        }

        let tracking = match (last, origin) {
            (Some(last), _) => {
                if !last.is_current {
                    self.checkout(&last.local_branch)?;
                }
                last.local_branch.clone()
            }
            (None, Some(origin)) => {
                let remote = self.git.remote_name();
                format!("{remote}/{}", strip_remote_prefix(origin, remote))
            }
            (None, None) => {
                return Err(LadderError::domain(
                    "The origin must be specified for zero-level branches.",
                ))
            }
        };

        let number = last.map(|level| level.number + 1).unwrap_or(0);
        if number > MAX_LEVEL {
            return Err(LadderError::domain(format!(
                "Stack '{}' already has the maximum number of levels.",
                stack.name
            )));
        }

        let branch = naming::encode(&stack.name, number);
        self.git.create_branch(&branch, &tracking)?;
        self.emit(StackEvent::BranchCreated {
            branch: branch.clone(),
            tracking: tracking.clone(),
        });

        self.checkout(&branch)?;
        self.git.push(&branch)?;
        self.emit(StackEvent::BranchPushed {
            branch: branch.clone(),
        });
        self.emit(StackEvent::LevelCreated {
            stack: stack.name.clone(),
            level: number,
        });

        self.reload_level(&stack.name, number)
    }

    /// Check out a level by its position in the stack.
    ///
    /// Positions past the top clamp to the top level.
    pub fn go_to_level(&self, stack_name: Option<&str>, level_index: i64) -> Result<StackLevel> {
        if self.git.has_uncommitted_changes()? {
            return Err(LadderError::uncommitted_changes());
        }

        let stack = self.require_stack(stack_name)?;
        let level = stack.select_level(level_index)?;

        if !level.is_current {
            self.checkout(&level.local_branch)?;
        }
        self.reload_level(&stack.name, level.number)
    }

    pub(crate) fn checkout(&self, branch: &str) -> Result<()> {
        self.git.checkout(branch)?;
        self.emit(StackEvent::BranchCheckedOut {
            branch: branch.to_string(),
        });
        Ok(())
    }

    /// Rediscover a level after the branch list changed
    pub(crate) fn reload_level(&self, stack_name: &str, number: u32) -> Result<StackLevel> {
        self.stack(stack_name)?
            .and_then(|stack| stack.level(number).cloned())
            .ok_or_else(|| {
                LadderError::config(format!(
                    "Level {number} of stack '{stack_name}' disappeared after it was updated"
                ))
            })
    }
}
