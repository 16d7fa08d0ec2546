//! Temporary repositories with a bare `origin` for exercising the engine
//! against real git state.

#![allow(dead_code)]

use ladder_cli::config::Settings;
use ladder_cli::git::GitRepository;
use ladder_cli::review::ReviewService;
use ladder_cli::stack::{StackEvent, StackManager};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Run git in `dir`, panicking with its stderr on failure. Returns stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A working copy on `master` with a bare repository as `origin`
pub struct TestRepo {
    _temp_dir: TempDir,
    pub path: PathBuf,
    pub origin: PathBuf,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("work");
        let origin = temp_dir.path().join("origin.git");
        std::fs::create_dir(&path).unwrap();

        git(temp_dir.path(), &["init", "--bare", "origin.git"]);
        git(&path, &["init"]);
        git(&path, &["config", "user.name", "Test User"]);
        git(&path, &["config", "user.email", "test@example.com"]);
        git(&path, &["config", "core.autocrlf", "false"]);

        std::fs::write(path.join("README.md"), "# Test Repository\n").unwrap();
        git(&path, &["add", "."]);
        git(&path, &["commit", "-m", "Initial commit"]);
        git(&path, &["branch", "-M", "master"]);
        git(&path, &["remote", "add", "origin", origin.to_str().unwrap()]);
        git(&path, &["push", "-u", "origin", "master"]);

        Self {
            _temp_dir: temp_dir,
            path,
            origin,
        }
    }

    /// Write `filename` and commit it on the checked-out branch
    pub fn commit(&self, filename: &str, message: &str) {
        std::fs::write(self.path.join(filename), format!("{message}\n")).unwrap();
        git(&self.path, &["add", filename]);
        git(&self.path, &["commit", "-m", message]);
    }

    pub fn current_branch(&self) -> String {
        git(&self.path, &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn local_branches(&self) -> Vec<String> {
        lines(git(
            &self.path,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        ))
    }

    /// Branches as the bare origin sees them
    pub fn origin_branches(&self) -> Vec<String> {
        lines(git(
            &self.origin,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        ))
    }

    pub fn manager(&self, review: Arc<dyn ReviewService>) -> StackManager {
        self.manager_with_settings(review, Settings::default())
    }

    pub fn manager_with_settings(
        &self,
        review: Arc<dyn ReviewService>,
        settings: Settings,
    ) -> StackManager {
        let repo = GitRepository::open_with_remote(&self.path, "origin").unwrap();
        StackManager::new(Arc::new(repo), review, settings)
    }

    /// A manager whose events are collected into the returned list
    pub fn recording_manager(
        &self,
        review: Arc<dyn ReviewService>,
    ) -> (StackManager, Arc<Mutex<Vec<StackEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let manager = self
            .manager(review)
            .with_event_sink(Arc::new(move |event: &StackEvent| {
                sink_events.lock().unwrap().push(event.clone());
            }));
        (manager, events)
    }
}

fn lines(output: String) -> Vec<String> {
    output
        .lines()
        .map(str::to_string)
        .filter(|line| !line.is_empty())
        .collect()
}
