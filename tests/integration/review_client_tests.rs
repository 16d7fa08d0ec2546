use ladder_cli::config::ReviewConfig;
use ladder_cli::errors::{ErrorKind, LadderError};
use ladder_cli::review::{
    AzureReposClient, AzureReposService, CreatePullRequestRequest, PullRequestStatus,
    ReviewService,
};
use mockito::Matcher;
use serde_json::json;

const REPO_PATH: &str = "/org/proj/_apis/git/repositories/repo";

fn service(server: &mockito::Server) -> AzureReposService {
    let config = ReviewConfig {
        token: Some("test-pat".to_string()),
        ..ReviewConfig::default()
    };
    let api_root = format!("{}{}", server.url(), REPO_PATH);
    AzureReposService::new(AzureReposClient::new(&config, &api_root).unwrap())
}

fn pull_request_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "pullRequestId": id,
        "status": status,
        "title": "featureA-001 Add parser",
        "description": "Add parser",
        "sourceRefName": "refs/heads/featureA/ss001",
        "targetRefName": "refs/heads/featureA/ss000",
        "creationDate": "2024-03-01T10:00:00Z",
        "repository": { "webUrl": "https://dev.azure.com/org/proj/_git/repo" }
    })
}

#[tokio::test]
async fn test_lookup_by_source_branch() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Regex(format!("^{REPO_PATH}/pullrequests")))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "searchCriteria.sourceRefName".into(),
                "refs/heads/featureA/ss001".into(),
            ),
            Matcher::UrlEncoded("searchCriteria.status".into(), "active".into()),
            Matcher::UrlEncoded("api-version".into(), "6.0".into()),
        ]))
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "value": [pull_request_json(42, "active")], "count": 1 }).to_string())
        .create_async()
        .await;

    let pr = service(&server)
        .get_pull_request_by_source_branch("featureA/ss001")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(pr.id, 42);
    assert_eq!(pr.status, PullRequestStatus::Active);
    assert_eq!(pr.title, "featureA-001 Add parser");
    assert_eq!(pr.url, "https://dev.azure.com/org/proj/_git/repo/pullrequest/42");
}

#[tokio::test]
async fn test_lookup_without_match() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Regex(format!("^{REPO_PATH}/pullrequests")))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "value": [], "count": 0 }).to_string())
        .create_async()
        .await;

    let pr = service(&server)
        .get_pull_request_by_source_branch("featureA/ss001")
        .await
        .unwrap();
    assert!(pr.is_none());
}

#[tokio::test]
async fn test_create_pull_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Regex(format!("^{REPO_PATH}/pullrequests")))
        .match_query(Matcher::UrlEncoded("api-version".into(), "6.0".into()))
        .match_body(Matcher::PartialJson(json!({
            "sourceRefName": "refs/heads/featureA/ss001",
            "targetRefName": "refs/heads/featureA/ss000",
            "title": "featureA-001 Add parser"
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(pull_request_json(7, "active").to_string())
        .create_async()
        .await;

    let pr = service(&server)
        .create_pull_request(CreatePullRequestRequest {
            source_branch: "featureA/ss001".to_string(),
            target_branch: "featureA/ss000".to_string(),
            title: "featureA-001 Add parser".to_string(),
            description: "Add parser".to_string(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(pr.id, 7);
    assert_eq!(pr.target_ref, "refs/heads/featureA/ss000");
}

#[tokio::test]
async fn test_abandon_sends_status_only() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", Matcher::Regex(format!("^{REPO_PATH}/pullrequests/42")))
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({ "status": "abandoned" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(pull_request_json(42, "abandoned").to_string())
        .create_async()
        .await;

    let pr = service(&server).abandon_pull_request(42).await.unwrap();

    mock.assert_async().await;
    assert_eq!(pr.status, PullRequestStatus::Abandoned);
    assert!(pr.status.is_terminal());
}

#[tokio::test]
async fn test_server_error_is_remote_service_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Regex(format!("^{REPO_PATH}/pullrequests")))
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let err = service(&server)
        .get_pull_request_by_source_branch("featureA/ss001")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteService);
    assert!(matches!(
        err,
        LadderError::RemoteService {
            status: Some(500),
            ..
        }
    ));
}

#[tokio::test]
async fn test_malformed_body_is_remote_service_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Regex(format!("^{REPO_PATH}/pullrequests")))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{ not json")
        .create_async()
        .await;

    let err = service(&server)
        .get_pull_request_by_source_branch("featureA/ss001")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteService);
}
