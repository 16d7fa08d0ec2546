//! The stack engine as a single capability interface.
//!
//! Front-ends talk to a [`StackEngine`] rather than to [`StackManager`], so a
//! transport that forwards calls to another process can stand in for the
//! in-process implementation without the callers changing.

use crate::errors::Result;
use crate::git::CommitSummary;
use crate::review::PullRequest;
use crate::stack::{
    DanglingWorkStatus, LevelSelector, LevelUpdate, PurgeResult, Stack, StackLevel, StackManager,
};
use async_trait::async_trait;
use tokio::sync::Mutex;

#[async_trait]
pub trait StackEngine: Send + Sync {
    /// All stacks of the repository, ordered by name
    async fn stacks(&self) -> Result<Vec<Stack>>;

    /// The stack whose level is checked out
    async fn current_stack(&self) -> Result<Option<Stack>>;

    async fn dangling_work_status(&self) -> Result<DanglingWorkStatus>;

    /// Start a stack on `origin`, or grow the named (or current) stack
    async fn create_stack(&self, name: Option<&str>, origin: Option<&str>) -> Result<StackLevel>;

    /// Append a level to the named (or current) stack
    async fn add_level(&self, stack_name: Option<&str>) -> Result<StackLevel>;

    async fn go_to_level(
        &self,
        stack_name: Option<&str>,
        selector: LevelSelector,
    ) -> Result<StackLevel>;

    /// One level with its commits and pull request filled in
    async fn level_details(
        &self,
        stack_name: Option<&str>,
        selector: LevelSelector,
    ) -> Result<StackLevel>;

    async fn stack_status(
        &self,
        stack_name: Option<&str>,
        selector: Option<LevelSelector>,
    ) -> Result<Stack>;

    async fn push_level(&self) -> Result<Option<Vec<CommitSummary>>>;

    async fn create_pull_request(
        &self,
        commit_description: Option<&str>,
    ) -> Result<Option<PullRequest>>;

    /// Abandon the pull request of the checked-out level
    async fn abandon_pull_request(&self) -> Result<Option<PullRequest>>;

    async fn branch_names(&self, stack_name: &str, include_remote: bool) -> Result<Vec<String>>;

    async fn purge_stack(&self, stack_name: &str, include_remote: bool) -> Result<PurgeResult>;

    async fn update_stack(&self, start: Option<u32>, stop: Option<u32>)
        -> Result<Vec<LevelUpdate>>;
}

/// In-process engine. Calls are serialized because they all share one
/// working directory.
pub struct LocalStackEngine {
    manager: Mutex<StackManager>,
}

impl LocalStackEngine {
    pub fn new(manager: StackManager) -> Self {
        Self {
            manager: Mutex::new(manager),
        }
    }
}

#[async_trait]
impl StackEngine for LocalStackEngine {
    async fn stacks(&self) -> Result<Vec<Stack>> {
        Ok(self.manager.lock().await.stacks()?.into_stacks())
    }

    async fn current_stack(&self) -> Result<Option<Stack>> {
        self.manager.lock().await.current_stack()
    }

    async fn dangling_work_status(&self) -> Result<DanglingWorkStatus> {
        self.manager.lock().await.dangling_work_status()
    }

    async fn create_stack(&self, name: Option<&str>, origin: Option<&str>) -> Result<StackLevel> {
        self.manager.lock().await.create_stack(name, origin)
    }

    async fn add_level(&self, stack_name: Option<&str>) -> Result<StackLevel> {
        let manager = self.manager.lock().await;
        let stack = manager.require_stack(stack_name)?;
        manager.add_level(&stack, None)
    }

    async fn go_to_level(
        &self,
        stack_name: Option<&str>,
        selector: LevelSelector,
    ) -> Result<StackLevel> {
        self.manager
            .lock()
            .await
            .go_to_level(stack_name, selector.to_index())
    }

    async fn level_details(
        &self,
        stack_name: Option<&str>,
        selector: LevelSelector,
    ) -> Result<StackLevel> {
        let manager = self.manager.lock().await;
        let stack = manager.require_stack(stack_name)?;
        let level = stack.select_level(selector.to_index())?;
        manager.level_details(level).await
    }

    async fn stack_status(
        &self,
        stack_name: Option<&str>,
        selector: Option<LevelSelector>,
    ) -> Result<Stack> {
        self.manager
            .lock()
            .await
            .stack_status(stack_name, selector)
            .await
    }

    async fn push_level(&self) -> Result<Option<Vec<CommitSummary>>> {
        self.manager.lock().await.push_level().await
    }

    async fn create_pull_request(
        &self,
        commit_description: Option<&str>,
    ) -> Result<Option<PullRequest>> {
        self.manager
            .lock()
            .await
            .create_pull_request(commit_description)
            .await
    }

    async fn abandon_pull_request(&self) -> Result<Option<PullRequest>> {
        self.manager
            .lock()
            .await
            .abandon_current_pull_request()
            .await
    }

    async fn branch_names(&self, stack_name: &str, include_remote: bool) -> Result<Vec<String>> {
        self.manager
            .lock()
            .await
            .branch_names(stack_name, include_remote)
    }

    async fn purge_stack(&self, stack_name: &str, include_remote: bool) -> Result<PurgeResult> {
        self.manager
            .lock()
            .await
            .purge_stack(stack_name, include_remote)
            .await
    }

    async fn update_stack(
        &self,
        start: Option<u32>,
        stop: Option<u32>,
    ) -> Result<Vec<LevelUpdate>> {
        self.manager.lock().await.update_stack(start, stop).await
    }
}
