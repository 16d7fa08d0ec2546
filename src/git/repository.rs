use crate::config::CONFIG_DIR_NAME;
use crate::errors::{LadderError, Result};
use crate::git::{BranchInfo, CommitGraph, CommitNode, GitAccess, UpstreamInfo};
use git2::build::CheckoutBuilder;
use git2::{BranchType, Oid, Repository, Signature};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Wrapper around git2::Repository with safe operations.
///
/// `git2::Repository` is not `Sync`, so the handle sits behind a mutex and
/// every operation holds the lock only for its own duration.
pub struct GitRepository {
    repo: Mutex<Repository>,
    path: PathBuf,
    remote: String,
}

impl GitRepository {
    /// Open a Git repository at the given path using the `origin` remote
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_remote(path, "origin")
    }

    pub fn open_with_remote(path: &Path, remote: &str) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| LadderError::config(format!("Not a git repository: {e}")))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| LadderError::config("Repository has no working directory"))?
            .to_path_buf();

        Ok(Self {
            repo: Mutex::new(repo),
            path: workdir,
            remote: remote.to_string(),
        })
    }

    fn repo(&self) -> Result<MutexGuard<'_, Repository>> {
        self.repo
            .lock()
            .map_err(|_| LadderError::config("Repository handle is poisoned"))
    }

    /// Get the HEAD commit hash
    pub fn head_commit_hash(&self) -> Result<String> {
        let repo = self.repo()?;
        let head = repo.head()?;
        let id = head.peel_to_commit()?.id();
        Ok(id.to_string())
    }

    /// Find a branch by name, ignoring case. Local branches win over
    /// remote-tracking ones.
    fn find_branch<'r>(
        &self,
        repo: &'r Repository,
        name: &str,
    ) -> Result<Option<(git2::Branch<'r>, BranchType)>> {
        for branch_type in [BranchType::Local, BranchType::Remote] {
            if let Ok(branch) = repo.find_branch(name, branch_type) {
                return Ok(Some((branch, branch_type)));
            }
        }

        let wanted = name.to_lowercase();
        for entry in repo.branches(None)? {
            let (branch, branch_type) = entry?;
            let matches = branch
                .name()?
                .map(|candidate| candidate.to_lowercase() == wanted)
                .unwrap_or(false);
            if matches {
                return Ok(Some((branch, branch_type)));
            }
        }
        Ok(None)
    }

    fn branch_info(
        &self,
        repo: &Repository,
        branch: &git2::Branch<'_>,
        branch_type: BranchType,
    ) -> Result<Option<BranchInfo>> {
        let Some(name) = branch.name()? else {
            return Ok(None);
        };
        // Skip symbolic refs such as origin/HEAD
        if branch_type == BranchType::Remote && name.ends_with("/HEAD") {
            return Ok(None);
        }

        let commit = branch.get().peel_to_commit()?;
        let upstream = match (branch_type, branch.get().name()) {
            (BranchType::Local, Some(refname)) => repo
                .branch_upstream_name(refname)
                .ok()
                .and_then(|buf| buf.as_str().and_then(UpstreamInfo::from_refname)),
            _ => None,
        };

        Ok(Some(BranchInfo {
            name: name.to_string(),
            is_remote: branch_type == BranchType::Remote,
            commit_hash: commit.id().to_string(),
            summary: commit.summary().unwrap_or_default().to_string(),
            upstream,
        }))
    }

    fn list_branches(&self, branch_type: BranchType) -> Result<Vec<BranchInfo>> {
        let repo = self.repo()?;
        let mut branches = Vec::new();
        for entry in repo.branches(Some(branch_type))? {
            let (branch, kind) = entry?;
            if let Some(info) = self.branch_info(&repo, &branch, kind)? {
                if kind == BranchType::Local || info.name.starts_with(&format!("{}/", self.remote))
                {
                    branches.push(info);
                }
            }
        }
        Ok(branches)
    }

    fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
        let mut callbacks = git2::RemoteCallbacks::new();

        // Try to use existing authentication from git config/credential manager
        callbacks.credentials(|_url, username_from_url, _allowed_types| {
            if let Some(username) = username_from_url {
                git2::Cred::ssh_key_from_agent(username)
            } else {
                git2::Cred::default()
            }
        });
        callbacks
    }

    /// Push a single refspec and surface per-ref rejections as errors
    fn push_refspec(&self, repo: &Repository, refspec: &str, branch: &str) -> Result<()> {
        let mut remote = repo
            .find_remote(&self.remote)
            .map_err(|e| LadderError::git_op("push", branch, e))?;

        let mut rejection: Option<String> = None;
        {
            let mut callbacks = Self::remote_callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejection = Some(format!("{refname}: {message}"));
                }
                Ok(())
            });

            let mut push_options = git2::PushOptions::new();
            push_options.remote_callbacks(callbacks);
            remote
                .push(&[refspec], Some(&mut push_options))
                .map_err(|e| LadderError::git_op("push", branch, e))?;
        }

        if let Some(reason) = rejection {
            return Err(LadderError::git_op(
                "push",
                branch,
                git2::Error::from_str(&format!("remote rejected {reason}")),
            ));
        }
        Ok(())
    }

    fn signature(repo: &Repository) -> Result<Signature<'static>> {
        let config = repo.config()?;
        match (
            config.get_string("user.name"),
            config.get_string("user.email"),
        ) {
            (Ok(name), Ok(email)) => Ok(Signature::now(&name, &email)?),
            _ => Err(LadderError::domain(
                "Git user.name and user.email must be configured before committing.",
            )),
        }
    }

    fn is_ladder_path(path: &str) -> bool {
        path == CONFIG_DIR_NAME || path.starts_with(&format!("{CONFIG_DIR_NAME}/"))
    }

    fn current_branch_name(repo: &Repository) -> Result<Option<String>> {
        let head = match repo.head() {
            Ok(head) => head,
            // Unborn branch or missing HEAD
            Err(_) => return Ok(None),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(str::to_string))
    }

    fn upstream_oid(repo: &Repository, branch: &str) -> Result<Option<Oid>> {
        let refname = format!("refs/heads/{branch}");
        let Ok(upstream) = repo.branch_upstream_name(&refname) else {
            return Ok(None);
        };
        let Some(upstream) = upstream.as_str() else {
            return Ok(None);
        };
        Ok(repo.refname_to_id(upstream).ok())
    }
}

impl CommitGraph for GitRepository {
    fn commit(&self, id: &str) -> Result<CommitNode> {
        let repo = self.repo()?;
        let oid = Oid::from_str(id)?;
        let commit = repo.find_commit(oid)?;
        Ok(CommitNode {
            id: commit.id().to_string(),
            short_message: commit.summary().unwrap_or_default().to_string(),
            parents: commit.parent_ids().map(|p| p.to_string()).collect(),
        })
    }
}

impl GitAccess for GitRepository {
    fn current_branch(&self) -> Result<Option<String>> {
        let repo = self.repo()?;
        Self::current_branch_name(&repo)
    }

    fn local_branches(&self) -> Result<Vec<BranchInfo>> {
        self.list_branches(BranchType::Local)
    }

    fn origin_branches(&self) -> Result<Vec<BranchInfo>> {
        self.list_branches(BranchType::Remote)
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        let repo = self.repo()?;
        let mut options = git2::StatusOptions::new();
        options.include_untracked(true).include_ignored(false);
        let statuses = repo.statuses(Some(&mut options))?;

        for status in statuses.iter() {
            if status.path().map(Self::is_ladder_path).unwrap_or(false) {
                continue;
            }
            if status.status().intersects(
                git2::Status::INDEX_MODIFIED
                    | git2::Status::INDEX_NEW
                    | git2::Status::INDEX_DELETED
                    | git2::Status::INDEX_RENAMED
                    | git2::Status::WT_MODIFIED
                    | git2::Status::WT_NEW
                    | git2::Status::WT_DELETED
                    | git2::Status::WT_RENAMED
                    | git2::Status::CONFLICTED,
            ) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn has_unpushed_commits(&self) -> Result<bool> {
        let repo = self.repo()?;
        let Some(branch) = Self::current_branch_name(&repo)? else {
            return Ok(false);
        };
        let Some(upstream) = Self::upstream_oid(&repo, &branch)? else {
            return Ok(false);
        };
        let head = repo.head()?.peel_to_commit()?.id();
        let (ahead, _behind) = repo.graph_ahead_behind(head, upstream)?;
        Ok(ahead > 0)
    }

    fn get_branch(&self, name: &str) -> Result<Option<BranchInfo>> {
        let repo = self.repo()?;
        let info = match self.find_branch(&repo, name)? {
            Some((branch, kind)) => self.branch_info(&repo, &branch, kind)?,
            None => None,
        };
        Ok(info)
    }

    fn create_branch(&self, new_branch: &str, track: &str) -> Result<()> {
        let repo = self.repo()?;
        if self.find_branch(&repo, new_branch)?.is_some() {
            return Err(LadderError::domain(format!(
                "Branch '{new_branch}' already exists."
            )));
        }

        let (track_branch, _) = self.find_branch(&repo, track)?.ok_or_else(|| {
            LadderError::domain(format!("Could not find branch '{track}' to branch from."))
        })?;
        let track_name = track_branch.name()?.unwrap_or(track).to_string();
        let target = track_branch
            .get()
            .peel_to_commit()
            .map_err(|e| LadderError::git_op("create branch", new_branch, e))?;

        let mut branch = repo
            .branch(new_branch, &target, false)
            .map_err(|e| LadderError::git_op("create branch", new_branch, e))?;
        branch
            .set_upstream(Some(&track_name))
            .map_err(|e| LadderError::git_op("set upstream", new_branch, e))?;

        info!("Created branch '{}' tracking '{}'", new_branch, track_name);
        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let repo = self.repo()?;
        let (branch, _) = self
            .find_branch(&repo, name)?
            .filter(|(_, kind)| *kind == BranchType::Local)
            .ok_or_else(|| LadderError::domain(format!("Could not find branch '{name}'.")))?;

        let refname = branch
            .get()
            .name()
            .ok_or_else(|| LadderError::config(format!("Branch '{name}' has an invalid name")))?
            .to_string();
        let tree = branch
            .get()
            .peel_to_tree()
            .map_err(|e| LadderError::git_op("checkout", name, e))?;

        repo.checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().safe()))
            .map_err(|e| LadderError::git_op("checkout", name, e))?;
        repo.set_head(&refname)
            .map_err(|e| LadderError::git_op("checkout", name, e))?;

        info!("Switched to branch '{}'", name);
        Ok(())
    }

    fn push(&self, name: &str) -> Result<()> {
        info!("Pushing branch: {}", name);
        let repo = self.repo()?;
        let local = repo
            .find_branch(name, BranchType::Local)
            .map_err(|e| LadderError::git_op("push", name, e))?;
        let tip = local
            .get()
            .peel_to_commit()
            .map_err(|e| LadderError::git_op("push", name, e))?
            .id();

        let refspec = format!("refs/heads/{name}:refs/heads/{name}");
        self.push_refspec(&repo, &refspec, name)?;

        // Keep the remote-tracking ref in step with what was just pushed
        repo.reference(
            &format!("refs/remotes/{}/{}", self.remote, name),
            tip,
            true,
            "ladder: push",
        )
        .map_err(|e| LadderError::git_op("push", name, e))?;

        info!("Push completed successfully");
        Ok(())
    }

    fn fetch(&self) -> Result<()> {
        info!("Fetching from {}", self.remote);
        let repo = self.repo()?;
        let mut remote = repo
            .find_remote(&self.remote)
            .map_err(|e| LadderError::git_op("fetch", &self.remote, e))?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(Self::remote_callbacks());
        remote
            .fetch::<&str>(&[], Some(&mut fetch_options), None)
            .map_err(|e| LadderError::git_op("fetch", &self.remote, e))?;

        debug!("Fetch completed successfully");
        Ok(())
    }

    fn pull(&self) -> Result<()> {
        self.fetch()?;

        let repo = self.repo()?;
        let branch = Self::current_branch_name(&repo)?
            .ok_or_else(|| LadderError::domain("Cannot pull on a detached HEAD."))?;
        info!("Pulling branch: {}", branch);

        let Some(upstream_oid) = Self::upstream_oid(&repo, &branch)? else {
            debug!("Branch '{}' has no upstream, nothing to pull", branch);
            return Ok(());
        };

        let annotated = repo.find_annotated_commit(upstream_oid)?;
        let (analysis, _) = repo.merge_analysis(&[&annotated])?;
        if analysis.is_up_to_date() {
            debug!("Already up to date");
            return Ok(());
        }

        let head_ref = format!("refs/heads/{branch}");
        if analysis.is_fast_forward() {
            let mut reference = repo.find_reference(&head_ref)?;
            reference
                .set_target(upstream_oid, "ladder: fast-forward")
                .map_err(|e| LadderError::git_op("pull", &branch, e))?;
            repo.set_head(&head_ref)?;
            repo.checkout_head(Some(CheckoutBuilder::new().force()))
                .map_err(|e| LadderError::git_op("pull", &branch, e))?;
            info!("Fast-forwarded '{}'", branch);
            return Ok(());
        }

        // 3-way merge
        let head_commit = repo.head()?.peel_to_commit()?;
        let upstream_commit = repo.find_commit(upstream_oid)?;
        let merge_base = repo.find_commit(repo.merge_base(head_commit.id(), upstream_oid)?)?;

        let mut index = repo.merge_trees(
            &merge_base.tree()?,
            &head_commit.tree()?,
            &upstream_commit.tree()?,
            None,
        )?;
        if index.has_conflicts() {
            return Err(LadderError::domain(format!(
                "Pulling into '{branch}' produced conflicts. Resolve them with git and retry."
            )));
        }

        let merged_tree = repo.find_tree(index.write_tree_to(&repo)?)?;
        let signature = Self::signature(&repo)?;
        let message = format!("Merge upstream into '{branch}'");
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &merged_tree,
            &[&head_commit, &upstream_commit],
        )?;
        repo.checkout_head(Some(CheckoutBuilder::new().force()))
            .map_err(|e| LadderError::git_op("pull", &branch, e))?;

        info!("Pull completed successfully");
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        info!("Deleting branch: {}", name);
        let repo = self.repo()?;
        let (mut branch, kind) = self
            .find_branch(&repo, name)?
            .ok_or_else(|| LadderError::domain(format!("Could not find branch '{name}'.")))?;

        if kind == BranchType::Remote {
            let full_name = branch.name()?.unwrap_or(name).to_string();
            let remote_branch = crate::git::strip_remote_prefix(&full_name, &self.remote);
            self.push_refspec(&repo, &format!(":refs/heads/{remote_branch}"), &full_name)?;

            // The push may already have pruned the remote-tracking ref
            if let Ok(mut stale) = repo.find_branch(&full_name, BranchType::Remote) {
                stale
                    .delete()
                    .map_err(|e| LadderError::git_op("delete", name, e))?;
            }
        } else {
            branch
                .delete()
                .map_err(|e| LadderError::git_op("delete", name, e))?;
        }

        info!("Deleted branch '{}'", name);
        Ok(())
    }

    fn commit_dangling_work(&self, description: &str) -> Result<String> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let skip_ladder: &mut git2::IndexMatchedPath = &mut |path, _| {
            if path.to_str().map(Self::is_ladder_path).unwrap_or(false) {
                1
            } else {
                0
            }
        };
        index.add_all(
            ["*"].iter(),
            git2::IndexAddOption::DEFAULT,
            Some(skip_ladder),
        )?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree = repo.find_tree(index.write_tree()?)?;
        let parent = repo.head()?.peel_to_commit()?;
        let signature = Self::signature(&repo)?;
        let commit_id = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            description,
            &tree,
            &[&parent],
        )?;

        info!("Created commit: {} - {}", commit_id, description);
        Ok(commit_id.to_string())
    }

    fn remote_name(&self) -> &str {
        &self.remote
    }

    fn remote_url(&self) -> Result<String> {
        let repo = self.repo()?;
        let remote = repo.find_remote(&self.remote)?;
        remote
            .url()
            .map(str::to_string)
            .ok_or_else(|| LadderError::config("Remote URL is not valid UTF-8"))
    }

    fn root_path(&self) -> &Path {
        &self.path
    }
}
