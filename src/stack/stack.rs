use crate::errors::{LadderError, Result};
use crate::git::CommitSummary;
use crate::review::PullRequest;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One branch of a stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackLevel {
    pub number: u32,
    pub stack_name: String,
    /// `<stack>/ssNNN`
    pub local_branch: String,
    /// What this level builds on: `origin/<base>` for level 0, the previous
    /// level's local branch otherwise
    pub tracking_branch: String,
    /// `<remote>/<local_branch>`
    pub remote_target_branch: String,
    pub is_current: bool,
    pub recent_commit_summary: Option<String>,

    // Filled on demand; `None` means not computed or not determinable
    pub unpushed_commits: Option<Vec<CommitSummary>>,
    pub unpulled_commits: Option<Vec<CommitSummary>>,
    pub all_commits: Option<Vec<CommitSummary>>,
    pub pull_request: Option<PullRequest>,
    /// Set once the commit lists were computed, even when some stayed `None`
    pub details_filled: bool,
}

impl StackLevel {
    pub fn new(
        stack_name: &str,
        number: u32,
        tracking_branch: &str,
        remote_name: &str,
    ) -> Self {
        let local_branch = super::naming::encode(stack_name, number);
        Self {
            number,
            stack_name: stack_name.to_string(),
            remote_target_branch: format!("{remote_name}/{local_branch}"),
            local_branch,
            tracking_branch: tracking_branch.to_string(),
            is_current: false,
            recent_commit_summary: None,
            unpushed_commits: None,
            unpulled_commits: None,
            all_commits: None,
            pull_request: None,
            details_filled: false,
        }
    }

    /// Commits on this level that the remote already has
    pub fn pushed_commits(&self) -> Option<Vec<CommitSummary>> {
        let all = self.all_commits.as_ref()?;
        let unpushed = self.unpushed_commits.as_deref().unwrap_or_default();
        Some(
            all.iter()
                .filter(|commit| !unpushed.iter().any(|u| u.id == commit.id))
                .cloned()
                .collect(),
        )
    }

    /// Whether commit details were filled in from git
    pub fn has_details(&self) -> bool {
        self.details_filled
    }
}

/// A named, ordered set of levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stack {
    pub name: String,
    pub levels: BTreeMap<u32, StackLevel>,
    pub current_level_number: Option<u32>,
    pub repository_url: String,
    pub repository_root_path: PathBuf,
}

impl Stack {
    pub fn new(name: &str, repository_url: &str, repository_root_path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            levels: BTreeMap::new(),
            current_level_number: None,
            repository_url: repository_url.to_string(),
            repository_root_path,
        }
    }

    /// Insert a level. Level numbers are unique within a stack.
    pub fn add_level(&mut self, level: StackLevel) -> Result<()> {
        if self.levels.contains_key(&level.number) {
            return Err(LadderError::domain(format!(
                "Stack '{}' already has a level {}.",
                self.name, level.number
            )));
        }
        if level.is_current {
            self.current_level_number = Some(level.number);
        }
        self.levels.insert(level.number, level);
        Ok(())
    }

    pub fn level(&self, number: u32) -> Option<&StackLevel> {
        self.levels.get(&number)
    }

    /// The n-th level in ascending order, not the level numbered n
    pub fn level_at_index(&self, index: usize) -> Option<&StackLevel> {
        self.levels.values().nth(index)
    }

    /// The level at position `index`, clamped to the top level.
    /// Negative positions are rejected.
    pub fn select_level(&self, index: i64) -> Result<&StackLevel> {
        if index < 0 {
            return Err(LadderError::domain(format!("Invalid stack level {index}.")));
        }
        if self.is_empty() {
            return Err(LadderError::domain(format!(
                "Stack '{}' has no levels.",
                self.name
            )));
        }
        let index = usize::try_from(index)
            .unwrap_or(usize::MAX)
            .min(self.len() - 1);
        self.level_at_index(index)
            .ok_or_else(|| LadderError::domain(format!("Invalid stack level {index}.")))
    }

    pub fn last_level(&self) -> Option<&StackLevel> {
        self.levels.values().next_back()
    }

    pub fn current_level(&self) -> Option<&StackLevel> {
        self.current_level_number
            .and_then(|number| self.levels.get(&number))
    }

    pub fn is_current(&self) -> bool {
        self.current_level_number.is_some()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Mark `number` as the checked-out level, clearing the flag elsewhere
    pub fn set_current_level(&mut self, number: Option<u32>) {
        for level in self.levels.values_mut() {
            level.is_current = Some(level.number) == number;
        }
        self.current_level_number = number.filter(|n| self.levels.contains_key(n));
    }

    /// Level numbers missing between 0 and the highest level
    pub fn level_gaps(&self) -> Vec<u32> {
        let Some(last) = self.last_level().map(|level| level.number) else {
            return Vec::new();
        };
        (0..last)
            .filter(|number| !self.levels.contains_key(number))
            .collect()
    }

    /// Same stack in the same repository, compared case-insensitively
    pub fn is_same_stack(&self, other: &Stack) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.repository_url.eq_ignore_ascii_case(&other.repository_url)
    }

    pub fn replace_level(&mut self, level: StackLevel) {
        self.levels.insert(level.number, level);
    }
}

/// Stacks of one repository keyed case-insensitively by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StackSet {
    stacks: BTreeMap<String, Stack>,
}

impl StackSet {
    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    pub fn get(&self, name: &str) -> Option<&Stack> {
        self.stacks.get(&Self::key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Stack> {
        self.stacks.get_mut(&Self::key(name))
    }

    /// Get the stack for `name`, creating an empty one on first use
    pub fn entry(&mut self, name: &str, repository_url: &str, root: &std::path::Path) -> &mut Stack {
        self.stacks
            .entry(Self::key(name))
            .or_insert_with(|| Stack::new(name, repository_url, root.to_path_buf()))
    }

    pub fn current(&self) -> Option<&Stack> {
        self.stacks.values().find(|stack| stack.is_current())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn into_stacks(self) -> Vec<Stack> {
        self.stacks.into_values().collect()
    }
}
