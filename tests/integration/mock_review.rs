//! In-memory review service for testing
//!
//! Pull requests live in a map keyed by id. Every call is recorded so tests
//! can check what the engine asked the service to do.

#![allow(dead_code)]

use async_trait::async_trait;
use ladder_cli::errors::{LadderError, Result};
use ladder_cli::review::{
    CreatePullRequestRequest, PullRequest, PullRequestPatch, PullRequestStatus, ReviewService,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewCall {
    Lookup(String),
    Create { source: String, target: String },
    Amend(i64),
    Abandon(i64),
}

pub struct MockReviewService {
    next_id: AtomicI64,
    pull_requests: Mutex<BTreeMap<i64, PullRequest>>,
    calls: Mutex<Vec<ReviewCall>>,
    error_on_lookup: Mutex<Option<String>>,
}

impl MockReviewService {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            pull_requests: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            error_on_lookup: Mutex::new(None),
        }
    }

    /// Make lookups fail with a 503
    pub fn fail_lookups(&self, msg: &str) {
        *self.error_on_lookup.lock().unwrap() = Some(msg.to_string());
    }

    pub fn calls(&self) -> Vec<ReviewCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pull_request(&self, id: i64) -> Option<PullRequest> {
        self.pull_requests.lock().unwrap().get(&id).cloned()
    }

    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.pull_requests.lock().unwrap().values().cloned().collect()
    }

    fn record(&self, call: ReviewCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn update(&self, id: i64, patch: PullRequestPatch) -> Result<PullRequest> {
        let mut pull_requests = self.pull_requests.lock().unwrap();
        let pr = pull_requests.get_mut(&id).ok_or_else(|| {
            LadderError::remote_service(Some(404), format!("Pull request {id} not found"))
        })?;
        if let Some(title) = patch.title {
            pr.title = title;
        }
        if let Some(description) = patch.description {
            pr.description = description;
        }
        if let Some(status) = patch.status {
            pr.status = status;
        }
        Ok(pr.clone())
    }
}

#[async_trait]
impl ReviewService for MockReviewService {
    async fn get_pull_request_by_source_branch(
        &self,
        branch: &str,
    ) -> Result<Option<PullRequest>> {
        self.record(ReviewCall::Lookup(branch.to_string()));
        if let Some(msg) = self.error_on_lookup.lock().unwrap().clone() {
            return Err(LadderError::remote_service(Some(503), msg));
        }

        let source_ref = format!("refs/heads/{branch}");
        Ok(self
            .pull_requests
            .lock()
            .unwrap()
            .values()
            .find(|pr| pr.source_ref == source_ref && pr.status == PullRequestStatus::Active)
            .cloned())
    }

    async fn create_pull_request(&self, request: CreatePullRequestRequest) -> Result<PullRequest> {
        self.record(ReviewCall::Create {
            source: request.source_branch.clone(),
            target: request.target_branch.clone(),
        });

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let pr = PullRequest {
            id,
            status: PullRequestStatus::Active,
            title: request.title,
            description: request.description,
            source_ref: format!("refs/heads/{}", request.source_branch),
            target_ref: format!("refs/heads/{}", request.target_branch),
            url: format!("https://review.example.com/pullrequest/{id}"),
            creation_date: None,
        };
        self.pull_requests.lock().unwrap().insert(id, pr.clone());
        Ok(pr)
    }

    async fn amend_pull_request(&self, id: i64, patch: PullRequestPatch) -> Result<PullRequest> {
        self.record(ReviewCall::Amend(id));
        self.update(id, patch)
    }

    async fn abandon_pull_request(&self, id: i64) -> Result<PullRequest> {
        self.record(ReviewCall::Abandon(id));
        self.update(
            id,
            PullRequestPatch {
                status: Some(PullRequestStatus::Abandoned),
                ..PullRequestPatch::default()
            },
        )
    }
}
