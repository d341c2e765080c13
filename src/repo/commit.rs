use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use super::operations::{FileChange, FileOperation};
use crate::errors::{CommitError, GitHubError};
use crate::github::{GitDataApi, RepoSlug, TreeEntry};
use crate::util::deadline_after;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_BRANCH_WAIT: Duration = Duration::from_secs(5);
const BRANCH_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Publishes a batch of file operations as exactly one commit on a branch.
///
/// Blobs, the tree and the commit object are unreachable until the final ref
/// update, so a failure at any earlier step leaves the branch untouched.
/// Commits to the same repository must be serialized by the caller.
pub struct CommitBuilder {
    api: Arc<dyn GitDataApi>,
    repo: RepoSlug,
    branch: String,
    branch_wait: Duration,
    branch_poll: Duration,
}

impl CommitBuilder {
    pub fn new(api: Arc<dyn GitDataApi>, repo: RepoSlug) -> Self {
        Self {
            api,
            repo,
            branch: DEFAULT_BRANCH.to_string(),
            branch_wait: DEFAULT_BRANCH_WAIT,
            branch_poll: BRANCH_POLL_INTERVAL,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// How long to wait for a freshly created repository's branch to appear.
    pub fn with_branch_wait(mut self, wait: Duration) -> Self {
        self.branch_wait = wait;
        self
    }

    pub fn with_branch_poll(mut self, poll: Duration) -> Self {
        self.branch_poll = poll;
        self
    }

    pub fn repo(&self) -> &RepoSlug {
        &self.repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Commit `operations` on top of the branch head and advance the branch.
    ///
    /// An empty operation list still produces a commit that reuses the head
    /// tree unchanged. Returns the new commit sha.
    pub async fn commit(
        &self,
        operations: &[FileOperation],
        message: &str,
    ) -> Result<String, CommitError> {
        match self.api.get_repository(&self.repo).await {
            Ok(_) => {}
            Err(GitHubError::NotFound { .. }) => {
                return Err(CommitError::RepoNotInitialized {
                    repo: self.repo.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let head = self.wait_for_branch().await?;
        let head_commit = self.api.get_commit(&self.repo, &head).await?;
        let base_tree = head_commit.tree.sha;
        debug!(repo = %self.repo, head = %head, base_tree = %base_tree, "resolved branch head");

        let tree = if operations.is_empty() {
            base_tree
        } else {
            let entries = self.tree_entries(operations).await?;
            self.api
                .create_tree(&self.repo, &base_tree, &entries)
                .await?
        };

        let sha = self
            .api
            .create_commit(&self.repo, message, &tree, std::slice::from_ref(&head))
            .await?;
        self.api.update_ref(&self.repo, &self.branch, &sha).await?;

        info!(
            repo = %self.repo,
            branch = %self.branch,
            sha = %sha,
            files = operations.len(),
            "committed"
        );
        Ok(sha)
    }

    async fn tree_entries(
        &self,
        operations: &[FileOperation],
    ) -> Result<Vec<TreeEntry>, GitHubError> {
        let mut entries = Vec::with_capacity(operations.len());
        for op in operations {
            let entry = match op.change() {
                FileChange::Create(content) | FileChange::Update(content) => {
                    let blob = self.api.create_blob(&self.repo, content).await?;
                    TreeEntry::blob(op.path(), blob)
                }
                FileChange::Delete => TreeEntry::removal(op.path()),
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Resolve the branch head, tolerating a branch that does not exist yet.
    async fn wait_for_branch(&self) -> Result<String, CommitError> {
        let started = Instant::now();
        let deadline = deadline_after(self.branch_wait);
        loop {
            match self.api.get_ref(&self.repo, &self.branch).await {
                Ok(git_ref) => return Ok(git_ref.object.sha),
                Err(e) if e.is_not_ready() => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(CommitError::BranchNotFound {
                            branch: self.branch.clone(),
                            waited_ms: started.elapsed().as_millis(),
                        });
                    }
                    debug!(repo = %self.repo, branch = %self.branch, "branch not ready yet");
                    sleep(self.branch_poll.min(deadline - now)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
