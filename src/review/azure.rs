use super::client::AzureReposClient;
use super::{
    CreatePullRequestRequest, PullRequest, PullRequestPatch, PullRequestStatus, ReviewService,
};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Pull request as returned by the Azure Repos REST API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestResource {
    pull_request_id: i64,
    status: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    source_ref_name: String,
    target_ref_name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    creation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    repository: Option<RepositoryResource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryResource {
    #[serde(default)]
    web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequestList {
    value: Vec<PullRequestResource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePullRequestBody {
    source_ref_name: String,
    target_ref_name: String,
    title: String,
    description: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePullRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
}

impl From<PullRequestResource> for PullRequest {
    fn from(resource: PullRequestResource) -> Self {
        // Prefer the browser link over the REST link
        let url = resource
            .repository
            .as_ref()
            .and_then(|repo| repo.web_url.as_ref())
            .map(|web| format!("{web}/pullrequest/{}", resource.pull_request_id))
            .or(resource.url)
            .unwrap_or_default();

        PullRequest {
            id: resource.pull_request_id,
            status: PullRequestStatus::from_api(&resource.status),
            title: resource.title.unwrap_or_default(),
            description: resource.description.unwrap_or_default(),
            source_ref: resource.source_ref_name,
            target_ref: resource.target_ref_name,
            url,
            creation_date: resource.creation_date,
        }
    }
}

fn branch_ref(branch: &str) -> String {
    if branch.starts_with(BRANCH_REF_PREFIX) {
        branch.to_string()
    } else {
        format!("{BRANCH_REF_PREFIX}{branch}")
    }
}

fn status_name(status: PullRequestStatus) -> Option<&'static str> {
    match status {
        PullRequestStatus::Active => Some("active"),
        PullRequestStatus::Abandoned => Some("abandoned"),
        PullRequestStatus::Completed => Some("completed"),
        PullRequestStatus::NotSet => None,
    }
}

/// [`ReviewService`] backed by Azure Repos pull requests
pub struct AzureReposService {
    client: AzureReposClient,
}

impl AzureReposService {
    pub fn new(client: AzureReposClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReviewService for AzureReposService {
    async fn get_pull_request_by_source_branch(
        &self,
        branch: &str,
    ) -> Result<Option<PullRequest>> {
        let source_ref = branch_ref(branch);
        let list: PullRequestList = self
            .client
            .get(
                "pullrequests",
                &[
                    ("searchCriteria.sourceRefName", source_ref.as_str()),
                    ("searchCriteria.status", "active"),
                ],
            )
            .await?;

        Ok(list
            .value
            .into_iter()
            .find(|pr| pr.source_ref_name.eq_ignore_ascii_case(&source_ref))
            .map(PullRequest::from))
    }

    async fn create_pull_request(&self, request: CreatePullRequestRequest) -> Result<PullRequest> {
        let body = CreatePullRequestBody {
            source_ref_name: branch_ref(&request.source_branch),
            target_ref_name: branch_ref(&request.target_branch),
            title: request.title,
            description: request.description,
        };
        let created: PullRequestResource = self.client.post("pullrequests", &body).await?;
        info!(
            "Created pull request {} from {}",
            created.pull_request_id, body.source_ref_name
        );
        Ok(created.into())
    }

    async fn amend_pull_request(&self, id: i64, patch: PullRequestPatch) -> Result<PullRequest> {
        let body = UpdatePullRequestBody {
            title: patch.title,
            description: patch.description,
            status: patch.status.and_then(status_name),
        };
        let updated: PullRequestResource = self
            .client
            .patch(&format!("pullrequests/{id}"), &body)
            .await?;
        Ok(updated.into())
    }

    async fn abandon_pull_request(&self, id: i64) -> Result<PullRequest> {
        self.amend_pull_request(
            id,
            PullRequestPatch {
                status: Some(PullRequestStatus::Abandoned),
                ..PullRequestPatch::default()
            },
        )
        .await
    }
}
