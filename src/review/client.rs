use crate::config::ReviewConfig;
use crate::errors::{LadderError, Result};
use base64::Engine;
use regex::Regex;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

static VISUALSTUDIO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?:[^@/]+@)?(?P<account>[^./]+)\.visualstudio\.com(?P<path>(?:/[^/]+)*?)/_git/(?P<repo>[^/]+?)/?$",
    )
    .expect("valid visualstudio.com pattern")
});

static DEV_AZURE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?:[^@/]+@)?dev\.azure\.com/(?P<org>[^/]+)/(?P<project>[^/]+)/_git/(?P<repo>[^/]+?)/?$",
    )
    .expect("valid dev.azure.com pattern")
});

static DEV_AZURE_SSH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:ssh://)?git@ssh\.dev\.azure\.com[:/]v3/(?P<org>[^/]+)/(?P<project>[^/]+)/(?P<repo>[^/]+?)/?$",
    )
    .expect("valid ssh.dev.azure.com pattern")
});

/// Derive the REST root of the git repository behind `remote_url`
pub fn api_root_from_remote_url(remote_url: &str) -> Result<String> {
    if let Some(captures) = VISUALSTUDIO_URL.captures(remote_url) {
        return Ok(format!(
            "https://{}.visualstudio.com{}/_apis/git/repositories/{}",
            &captures["account"], &captures["path"], &captures["repo"]
        ));
    }

    if let Some(captures) = DEV_AZURE_URL
        .captures(remote_url)
        .or_else(|| DEV_AZURE_SSH_URL.captures(remote_url))
    {
        return Ok(format!(
            "https://dev.azure.com/{}/{}/_apis/git/repositories/{}",
            &captures["org"], &captures["project"], &captures["repo"]
        ));
    }

    Err(LadderError::config(format!(
        "'{remote_url}' is not an Azure Repos URL"
    )))
}

/// Azure Repos REST client scoped to one repository
pub struct AzureReposClient {
    client: Client,
    api_root: String,
    api_version: String,
}

impl AzureReposClient {
    /// Create a new client. Authenticates with a personal access token.
    pub fn new(config: &ReviewConfig, api_root: &str) -> Result<Self> {
        let token = config.resolved_token().ok_or_else(|| {
            LadderError::config(format!(
                "No review token configured. Set {} or review.token.",
                crate::config::TOKEN_ENV_VAR
            ))
        })?;

        let mut headers = HeaderMap::new();

        // PATs use basic auth with an empty user name
        let auth_encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{token}"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {auth_encoded}"))
                .map_err(|e| LadderError::config(format!("Invalid auth header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| LadderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    /// Full URL for `path` below the repository root, with `api-version` set
    fn api_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.api_root,
            path.trim_start_matches('/')
        ))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("api-version", &self.api_version);
        }
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.api_url(path, query)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            LadderError::remote_service(None, format!("GET request failed: {e}"))
        })?;

        self.handle_response(response).await
    }

    /// Make a POST request
    pub async fn post<T, U>(&self, path: &str, body: &T) -> Result<U>
    where
        T: Serialize,
        U: for<'de> Deserialize<'de>,
    {
        let url = self.api_url(path, &[])?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                LadderError::remote_service(None, format!("POST request failed: {e}"))
            })?;

        self.handle_response(response).await
    }

    /// Make a PATCH request
    pub async fn patch<T, U>(&self, path: &str, body: &T) -> Result<U>
    where
        T: Serialize,
        U: for<'de> Deserialize<'de>,
    {
        let url = self.api_url(path, &[])?;
        debug!("PATCH {}", url);

        let response = self
            .client
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                LadderError::remote_service(None, format!("PATCH request failed: {e}"))
            })?;

        self.handle_response(response).await
    }

    /// Handle HTTP response and deserialize JSON
    async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();

        if status.is_success() {
            let text = response.text().await.map_err(|e| {
                LadderError::remote_service(
                    Some(status.as_u16()),
                    format!("Failed to read response body: {e}"),
                )
            })?;

            trace!("Response body: {}", text);

            serde_json::from_str(&text).map_err(|e| {
                LadderError::remote_service(
                    Some(status.as_u16()),
                    format!("Failed to parse JSON response: {e}"),
                )
            })
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(LadderError::remote_service(
                Some(status.as_u16()),
                format!("Request failed with status {status}: {text}"),
            ))
        }
    }
}
