//! Code review service integration
//!
//! The stack engine only needs four calls from a review service: find the
//! open pull request for a branch, create one, amend one and abandon one.

pub mod azure;
pub mod client;

pub use azure::AzureReposService;
pub use client::{api_root_from_remote_url, AzureReposClient};

use crate::config::ReviewConfig;
use crate::errors::{LadderError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullRequestStatus {
    NotSet,
    Active,
    Abandoned,
    Completed,
}

impl PullRequestStatus {
    /// Abandoned and completed pull requests never change again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PullRequestStatus::Abandoned | PullRequestStatus::Completed
        )
    }

    pub fn from_api(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "active" => PullRequestStatus::Active,
            "abandoned" => PullRequestStatus::Abandoned,
            "completed" => PullRequestStatus::Completed,
            _ => PullRequestStatus::NotSet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: i64,
    pub status: PullRequestStatus,
    pub title: String,
    pub description: String,
    pub source_ref: String,
    pub target_ref: String,
    pub url: String,
    pub creation_date: Option<DateTime<Utc>>,
}

/// Request to create a new pull request. Branch names are short names;
/// services add the `refs/heads/` prefix themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePullRequestRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
}

/// Fields to change on an existing pull request; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PullRequestPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<PullRequestStatus>,
}

#[async_trait]
pub trait ReviewService: Send + Sync {
    /// The active pull request whose source is `branch`, if any
    async fn get_pull_request_by_source_branch(&self, branch: &str)
        -> Result<Option<PullRequest>>;

    async fn create_pull_request(&self, request: CreatePullRequestRequest) -> Result<PullRequest>;

    async fn amend_pull_request(&self, id: i64, patch: PullRequestPatch) -> Result<PullRequest>;

    async fn abandon_pull_request(&self, id: i64) -> Result<PullRequest>;
}

/// Stand-in used when the remote is not a recognised review host. Every call
/// fails with a configuration error, so purely local commands keep working.
pub struct UnconfiguredReviewService {
    reason: String,
}

impl UnconfiguredReviewService {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> LadderError {
        LadderError::config(format!(
            "Code review is not available: {}. Set review.api_url with 'ladder config set'.",
            self.reason
        ))
    }
}

#[async_trait]
impl ReviewService for UnconfiguredReviewService {
    async fn get_pull_request_by_source_branch(
        &self,
        _branch: &str,
    ) -> Result<Option<PullRequest>> {
        Err(self.error())
    }

    async fn create_pull_request(&self, _request: CreatePullRequestRequest) -> Result<PullRequest> {
        Err(self.error())
    }

    async fn amend_pull_request(&self, _id: i64, _patch: PullRequestPatch) -> Result<PullRequest> {
        Err(self.error())
    }

    async fn abandon_pull_request(&self, _id: i64) -> Result<PullRequest> {
        Err(self.error())
    }
}

/// Build the review service for a repository. Falls back to
/// [`UnconfiguredReviewService`] when no API root can be determined.
pub fn create_review_service(config: &ReviewConfig, remote_url: &str) -> Arc<dyn ReviewService> {
    let api_root = match &config.api_url {
        Some(url) => Ok(url.clone()),
        None => api_root_from_remote_url(remote_url),
    };

    let client = api_root.and_then(|root| AzureReposClient::new(config, &root));
    match client {
        Ok(client) => Arc::new(AzureReposService::new(client)),
        Err(e) => {
            tracing::debug!("Review service unavailable: {}", e);
            Arc::new(UnconfiguredReviewService::new(e.to_string()))
        }
    }
}
