use super::mock_review::{MockReviewService, ReviewCall};
use super::test_helpers::{git, TestRepo};
use ladder_cli::config::Settings;
use ladder_cli::review::{PullRequestStatus, UnconfiguredReviewService};
use ladder_cli::stack::{LevelSelector, Severity, StackEvent};
use std::sync::{Arc, Mutex};

/// A repository with stack `featureA` checked out at level 1
fn setup() -> (TestRepo, Arc<MockReviewService>) {
    let repo = TestRepo::new();
    let review = Arc::new(MockReviewService::new());
    repo.manager(review.clone())
        .create_stack(Some("featureA"), None)
        .unwrap();
    (repo, review)
}

#[tokio::test]
async fn test_push_level_reports_unpushed_commits() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    repo.commit("a.txt", "Add parser");
    repo.commit("b.txt", "Add lexer");
    repo.commit("c.txt", "Add tests");

    let level = manager.stack("featureA").unwrap().unwrap().level(1).cloned().unwrap();
    let details = manager.level_details(&level).await.unwrap();
    assert_eq!(details.all_commits.as_ref().unwrap().len(), 3);
    assert_eq!(details.unpushed_commits.as_ref().unwrap().len(), 3);
    assert_eq!(details.recent_commit_summary.as_deref(), Some("Add tests"));

    let pushed = manager.push_level().await.unwrap().unwrap();
    let messages: Vec<&str> = pushed.iter().map(|c| c.short_message.as_str()).collect();
    assert_eq!(messages, vec!["Add tests", "Add lexer", "Add parser"]);

    let details = manager.level_details(&level).await.unwrap();
    assert_eq!(details.unpushed_commits, Some(vec![]));
    assert_eq!(details.pushed_commits().unwrap().len(), 3);

    // Nothing to amend without a pull request
    assert!(!review
        .calls()
        .iter()
        .any(|call| matches!(call, ReviewCall::Amend(_))));
}

#[tokio::test]
async fn test_push_level_refuses_dirty_tree() {
    let (repo, review) = setup();
    let manager = repo.manager(review);

    std::fs::write(repo.path.join("scratch.txt"), "wip").unwrap();
    let err = manager.push_level().await.unwrap_err();
    assert!(err.is_domain_rule());
}

#[tokio::test]
async fn test_push_with_unknown_ancestry_still_pushes() {
    let (repo, review) = setup();
    let mut settings = Settings::default();
    settings.stack.ancestry_search_rounds = 1;
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let manager = repo
        .manager_with_settings(review, settings)
        .with_event_sink(Arc::new(move |event: &StackEvent| {
            sink_events.lock().unwrap().push(event.clone());
        }));

    repo.commit("a.txt", "Add parser");
    repo.commit("b.txt", "Add lexer");
    repo.commit("c.txt", "Add tests");

    let pushed = manager.push_level().await.unwrap();
    assert!(pushed.is_none());
    assert_eq!(
        git(&repo.path, &["rev-parse", "featureA/ss001"]),
        git(&repo.origin, &["rev-parse", "featureA/ss001"])
    );
    assert!(events.lock().unwrap().iter().any(|event| matches!(
        event,
        StackEvent::Message { severity: Severity::Warning, text } if text.contains("Could not relate")
    )));
}

#[tokio::test]
async fn test_create_pull_request_from_pushed_work() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    repo.commit("a.txt", "Add parser");
    repo.commit("b.txt", "Add lexer");
    manager.push_level().await.unwrap();

    let pr = manager.create_pull_request(None).await.unwrap().unwrap();
    assert_eq!(pr.title, "featureA-001 Add parser");
    assert_eq!(pr.description, "Add parser\nAdd lexer");
    assert_eq!(pr.source_ref, "refs/heads/featureA/ss001");
    assert_eq!(pr.target_ref, "refs/heads/featureA/ss000");
    // The level is looked up again once the pull request exists
    assert_eq!(
        review.calls().last(),
        Some(&ReviewCall::Lookup("featureA/ss001".to_string()))
    );

    // A second call finds the same pull request
    let again = manager.create_pull_request(None).await.unwrap().unwrap();
    assert_eq!(again.id, pr.id);
    let creates = review
        .calls()
        .into_iter()
        .filter(|call| matches!(call, ReviewCall::Create { .. }))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn test_level_zero_targets_origin_branch() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    manager.go_to_level(None, 0).unwrap();
    repo.commit("base.txt", "Prepare base");
    manager.push_level().await.unwrap();

    let pr = manager.create_pull_request(None).await.unwrap().unwrap();
    assert_eq!(pr.title, "featureA-000 Prepare base");
    assert_eq!(pr.target_ref, "refs/heads/master");
}

#[tokio::test]
async fn test_push_appends_to_pull_request_description() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    repo.commit("a.txt", "Add parser");
    manager.push_level().await.unwrap();
    let pr = manager.create_pull_request(None).await.unwrap().unwrap();

    repo.commit("b.txt", "Handle errors");
    repo.commit("c.txt", "Add docs");
    let pushed = manager.push_level().await.unwrap().unwrap();
    assert_eq!(pushed.len(), 2);

    let amended = review.pull_request(pr.id).unwrap();
    assert_eq!(amended.description, "Add parser\nHandle errors\nAdd docs");
    assert!(review.calls().contains(&ReviewCall::Amend(pr.id)));
}

#[tokio::test]
async fn test_create_pull_request_commits_dangling_work() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    std::fs::write(repo.path.join("lexer.rs"), "fn lex() {}\n").unwrap();
    let pr = manager
        .create_pull_request(Some("Add lexer"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(pr.title, "featureA-001 Add lexer");
    assert_eq!(git(&repo.path, &["log", "-1", "--format=%s"]), "Add lexer");
    assert_eq!(
        git(&repo.path, &["rev-parse", "featureA/ss001"]),
        git(&repo.origin, &["rev-parse", "featureA/ss001"])
    );
}

#[tokio::test]
async fn test_commit_description_without_dangling_work() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    let err = manager
        .create_pull_request(Some("Nothing to commit"))
        .await
        .unwrap_err();
    assert!(err.is_domain_rule());
    assert!(review.pull_requests().is_empty());
}

#[tokio::test]
async fn test_no_pull_request_without_pushed_work() {
    let (repo, review) = setup();
    let (manager, events) = repo.recording_manager(review.clone());

    // Committed but never pushed
    repo.commit("a.txt", "Add parser");
    let pr = manager.create_pull_request(None).await.unwrap();
    assert!(pr.is_none());
    assert!(review.pull_requests().is_empty());
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|event| event.severity() == Severity::Error));
}

#[tokio::test]
async fn test_abandon_current_pull_request() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    assert!(manager.abandon_current_pull_request().await.unwrap().is_none());

    repo.commit("a.txt", "Add parser");
    manager.push_level().await.unwrap();
    let pr = manager.create_pull_request(None).await.unwrap().unwrap();

    let abandoned = manager.abandon_current_pull_request().await.unwrap().unwrap();
    assert_eq!(abandoned.id, pr.id);
    assert_eq!(
        review.pull_request(pr.id).unwrap().status,
        PullRequestStatus::Abandoned
    );
}

#[tokio::test]
async fn test_stack_status_fills_every_level() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    repo.commit("a.txt", "Add parser");
    manager.push_level().await.unwrap();
    let pr = manager.create_pull_request(None).await.unwrap().unwrap();

    let stack = manager.stack_status(None, None).await.unwrap();
    assert_eq!(stack.len(), 2);
    assert!(stack.levels.values().all(|level| level.has_details()));
    assert!(stack.level(0).unwrap().pull_request.is_none());
    assert_eq!(
        stack.level(1).unwrap().pull_request.as_ref().map(|pr| pr.id),
        Some(pr.id)
    );

    let top = manager
        .stack_status(Some("featureA"), Some(LevelSelector::Top))
        .await
        .unwrap();
    assert!(top.level(1).unwrap().has_details());
    assert!(!top.level(0).unwrap().has_details());
}

#[tokio::test]
async fn test_lookup_failures_do_not_block_pushes() {
    let (repo, review) = setup();
    let (manager, events) = repo.recording_manager(review.clone());
    review.fail_lookups("service unavailable");

    repo.commit("a.txt", "Add parser");
    let pushed = manager.push_level().await.unwrap().unwrap();
    assert_eq!(pushed.len(), 1);
    assert!(events.lock().unwrap().iter().any(|event| matches!(
        event,
        StackEvent::Message { severity: Severity::Warning, text } if text.contains("service unavailable")
    )));
}

#[tokio::test]
async fn test_local_only_repository_can_push() {
    let repo = TestRepo::new();
    let manager = repo.manager(Arc::new(UnconfiguredReviewService::new("no review host")));
    manager.create_stack(Some("featureA"), None).unwrap();

    repo.commit("a.txt", "Add parser");
    assert_eq!(manager.push_level().await.unwrap().unwrap().len(), 1);
    assert!(manager.create_pull_request(None).await.is_err());
}

#[tokio::test]
async fn test_update_stack_pulls_and_pushes() {
    let (repo, review) = setup();
    let manager = repo.manager(review);

    repo.commit("a.txt", "Add parser");
    manager.create_stack(None, None).unwrap();
    repo.commit("b.txt", "Use parser");

    // Level 1 gains a commit the level above does not have yet
    manager.go_to_level(None, 1).unwrap();
    repo.commit("c.txt", "Fix parser");
    manager.go_to_level(None, 2).unwrap();

    let updates = manager.update_stack(None, None).await.unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].branch, "featureA/ss001");
    assert_eq!(updates[0].pushed_commits, Some(2));
    assert!(updates[1].pushed_commits.is_some_and(|count| count > 0));

    assert_eq!(repo.current_branch(), "featureA/ss002");
    git(
        &repo.path,
        &["merge-base", "--is-ancestor", "featureA/ss001", "featureA/ss002"],
    );
    assert_eq!(
        git(&repo.path, &["rev-parse", "featureA/ss002"]),
        git(&repo.origin, &["rev-parse", "featureA/ss002"])
    );
}

#[tokio::test]
async fn test_purge_removes_branches_and_pull_requests() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());

    repo.commit("a.txt", "Add parser");
    manager.push_level().await.unwrap();
    let pr = manager.create_pull_request(None).await.unwrap().unwrap();

    let result = manager.purge_stack("featureA", true).await.unwrap();
    assert!(result.is_complete(), "{:?}", result.failed);
    assert_eq!(result.abandoned_pull_requests, vec![pr.id]);
    assert_eq!(result.deleted_branches.len(), 4);

    assert_eq!(repo.current_branch(), "master");
    assert_eq!(repo.local_branches(), vec!["master"]);
    assert_eq!(repo.origin_branches(), vec!["master"]);
    assert_eq!(
        review.pull_request(pr.id).unwrap().status,
        PullRequestStatus::Abandoned
    );
    assert!(manager.stack("featureA").unwrap().is_none());
}

#[tokio::test]
async fn test_purge_keeps_remote_branches_by_default() {
    let (repo, review) = setup();
    let manager = repo.manager(review);

    let result = manager.purge_stack("featureA", false).await.unwrap();
    assert_eq!(result.deleted_branches.len(), 2);
    assert_eq!(repo.local_branches(), vec!["master"]);
    assert!(repo.origin_branches().contains(&"featureA/ss001".to_string()));
}

#[tokio::test]
async fn test_purge_collects_lookup_failures() {
    let (repo, review) = setup();
    let manager = repo.manager(review.clone());
    review.fail_lookups("service unavailable");

    let result = manager.purge_stack("featureA", false).await.unwrap();
    assert!(!result.is_complete());
    assert_eq!(result.failed.len(), 2);
    assert_eq!(repo.local_branches(), vec!["master"]);
}

#[tokio::test]
async fn test_purge_continues_past_undeletable_branch() {
    let (repo, review) = setup();
    let manager = repo.manager(review);

    // Without a master branch there is nowhere to go, so the checked-out
    // level cannot be deleted
    git(&repo.path, &["branch", "-D", "master"]);
    git(&repo.path, &["update-ref", "-d", "refs/remotes/origin/master"]);

    let result = manager.purge_stack("featureA", false).await.unwrap();
    assert!(!result.is_complete());
    assert_eq!(result.deleted_branches, vec!["featureA/ss000"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].0, "featureA/ss001");

    assert_eq!(repo.current_branch(), "featureA/ss001");
    assert_eq!(repo.local_branches(), vec!["featureA/ss001"]);
}
