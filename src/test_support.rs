//! In-memory stand-in for the GitHub git-data and Actions APIs.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::GitHubError;
use crate::github::models::{GitObject, ShaRef};
use crate::github::{
    ActionsApi, GitCommit, GitDataApi, GitRef, RepoSlug, Repository, RunFilter, TreeEntry,
    WorkflowRun,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    GetRepository,
    GetRef,
    GetCommit,
    CreateBlob,
    CreateTree,
    CreateCommit,
    UpdateRef,
    ListRuns,
    GetRun,
    DownloadLogs,
}

struct StoredCommit {
    tree: String,
    parents: Vec<String>,
    message: String,
}

/// CI behaviour applied to every ref update: each push gets a completed run
/// whose conclusion is taken from `outcomes` in order (the last one repeats).
struct AutoCi {
    outcomes: Vec<String>,
    logs: Vec<u8>,
    pushes: usize,
}

#[derive(Default)]
struct HostState {
    repo_exists: bool,
    next_id: u64,
    blobs: HashMap<String, String>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, StoredCommit>,
    branches: HashMap<String, String>,
    hidden_ref_reads: usize,
    runs: Vec<WorkflowRun>,
    run_updates: HashMap<u64, VecDeque<WorkflowRun>>,
    logs: HashMap<u64, Vec<u8>>,
    auto_ci: Option<AutoCi>,
    listed_shas: Vec<String>,
    calls: HashMap<HostCall, usize>,
    failures: HashMap<HostCall, VecDeque<GitHubError>>,
}

impl HostState {
    fn next_sha(&mut self) -> String {
        self.next_id += 1;
        format!("{:040x}", self.next_id)
    }

    fn record(&mut self, call: HostCall) -> Result<(), GitHubError> {
        *self.calls.entry(call).or_default() += 1;
        match self.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn push_auto_run(&mut self, sha: &str) {
        let Some(ci) = self.auto_ci.as_mut() else {
            return;
        };
        let idx = ci.pushes.min(ci.outcomes.len().saturating_sub(1));
        let conclusion = ci.outcomes.get(idx).cloned().unwrap_or_default();
        let logs = ci.logs.clone();
        ci.pushes += 1;

        let id = 9000 + ci.pushes as u64;
        self.logs.insert(id, logs);
        self.runs.push(completed_run(id, sha, &conclusion));
    }
}

pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    /// A repository whose `main` branch holds one commit with `files`.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let mut state = HostState {
            repo_exists: true,
            ..Default::default()
        };
        let mut tree = BTreeMap::new();
        for (path, content) in files {
            let blob = state.next_sha();
            state.blobs.insert(blob.clone(), content.to_string());
            tree.insert(path.to_string(), blob);
        }
        let tree_sha = state.next_sha();
        state.trees.insert(tree_sha.clone(), tree);
        let commit_sha = state.next_sha();
        state.commits.insert(
            commit_sha.clone(),
            StoredCommit {
                tree: tree_sha,
                parents: Vec::new(),
                message: "Initial commit".to_string(),
            },
        );
        state.branches.insert("main".to_string(), commit_sha);
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn new() -> Self {
        Self::with_files(&[("README.md", "# project\n")])
    }

    pub fn missing_repository() -> Self {
        Self {
            state: Mutex::new(HostState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    /// Make the next `reads` branch lookups answer 404.
    pub fn hide_branch_for(&self, reads: usize) {
        self.state().hidden_ref_reads = reads;
    }

    /// Fail the next call of `call` with `err`. Queued errors are consumed in order.
    pub fn fail_next(&self, call: HostCall, err: GitHubError) {
        self.state()
            .failures
            .entry(call)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self, call: HostCall) -> usize {
        self.state().calls.get(&call).copied().unwrap_or(0)
    }

    pub fn head(&self, branch: &str) -> Option<String> {
        self.state().branches.get(branch).cloned()
    }

    pub fn parents(&self, sha: &str) -> Vec<String> {
        self.state()
            .commits
            .get(sha)
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }

    pub fn commit_message(&self, sha: &str) -> Option<String> {
        self.state().commits.get(sha).map(|c| c.message.clone())
    }

    pub fn tree_of(&self, sha: &str) -> Option<String> {
        self.state().commits.get(sha).map(|c| c.tree.clone())
    }

    /// Number of commits reachable or not, including the initial one.
    pub fn commit_count(&self) -> usize {
        self.state().commits.len()
    }

    /// Path to content for the tree at the head of `branch`.
    pub fn files(&self, branch: &str) -> BTreeMap<String, String> {
        let state = self.state();
        let Some(tree) = state
            .branches
            .get(branch)
            .and_then(|head| state.commits.get(head))
            .and_then(|commit| state.trees.get(&commit.tree))
        else {
            return BTreeMap::new();
        };
        tree.iter()
            .map(|(path, blob)| {
                let content = state.blobs.get(blob).cloned().unwrap_or_default();
                (path.clone(), content)
            })
            .collect()
    }

    pub fn add_run(&self, run: WorkflowRun) {
        self.state().runs.push(run);
    }

    /// Successive `get_run` answers for `run_id`; the last one repeats.
    pub fn script_run(&self, run_id: u64, updates: Vec<WorkflowRun>) {
        self.state().run_updates.insert(run_id, updates.into());
    }

    pub fn set_logs(&self, run_id: u64, archive: Vec<u8>) {
        self.state().logs.insert(run_id, archive);
    }

    /// Every ref update triggers a completed run with the next conclusion.
    pub fn auto_ci(&self, outcomes: &[&str], failure_logs: Vec<u8>) {
        self.state().auto_ci = Some(AutoCi {
            outcomes: outcomes.iter().map(|s| s.to_string()).collect(),
            logs: failure_logs,
            pushes: 0,
        });
    }

    /// Head shas passed to `list_runs`, in call order.
    pub fn listed_shas(&self) -> Vec<String> {
        self.state().listed_shas.clone()
    }
}

#[async_trait]
impl GitDataApi for MemoryHost {
    async fn get_repository(&self, repo: &RepoSlug) -> Result<Repository, GitHubError> {
        let mut state = self.state();
        state.record(HostCall::GetRepository)?;
        if !state.repo_exists {
            return Err(GitHubError::NotFound {
                path: repo.api_path(),
            });
        }
        Ok(Repository {
            name: repo.name.clone(),
            full_name: repo.to_string(),
            html_url: format!("https://github.com/{}", repo),
            default_branch: Some("main".to_string()),
        })
    }

    async fn get_ref(&self, repo: &RepoSlug, branch: &str) -> Result<GitRef, GitHubError> {
        let mut state = self.state();
        state.record(HostCall::GetRef)?;
        let not_found = || GitHubError::NotFound {
            path: format!("{}/git/ref/heads/{}", repo.api_path(), branch),
        };
        if state.hidden_ref_reads > 0 {
            state.hidden_ref_reads -= 1;
            return Err(not_found());
        }
        let sha = state.branches.get(branch).cloned().ok_or_else(not_found)?;
        Ok(GitRef {
            name: format!("refs/heads/{}", branch),
            object: GitObject {
                sha,
                kind: Some("commit".to_string()),
            },
        })
    }

    async fn get_commit(&self, repo: &RepoSlug, sha: &str) -> Result<GitCommit, GitHubError> {
        let mut state = self.state();
        state.record(HostCall::GetCommit)?;
        let commit = state.commits.get(sha).ok_or_else(|| GitHubError::NotFound {
            path: format!("{}/git/commits/{}", repo.api_path(), sha),
        })?;
        Ok(GitCommit {
            sha: sha.to_string(),
            tree: ShaRef {
                sha: commit.tree.clone(),
            },
            message: Some(commit.message.clone()),
            parents: commit
                .parents
                .iter()
                .map(|p| ShaRef { sha: p.clone() })
                .collect(),
        })
    }

    async fn create_blob(&self, _repo: &RepoSlug, content: &str) -> Result<String, GitHubError> {
        let mut state = self.state();
        state.record(HostCall::CreateBlob)?;
        let sha = state.next_sha();
        state.blobs.insert(sha.clone(), content.to_string());
        Ok(sha)
    }

    async fn create_tree(
        &self,
        _repo: &RepoSlug,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, GitHubError> {
        let mut state = self.state();
        state.record(HostCall::CreateTree)?;
        let mut tree = state
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| GitHubError::Api {
                status: 422,
                message: format!("base_tree {} is invalid", base_tree),
            })?;
        for entry in entries {
            match &entry.sha {
                Some(blob) => {
                    tree.insert(entry.path.clone(), blob.clone());
                }
                None => {
                    tree.remove(&entry.path);
                }
            }
        }
        let sha = state.next_sha();
        state.trees.insert(sha.clone(), tree);
        Ok(sha)
    }

    async fn create_commit(
        &self,
        _repo: &RepoSlug,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, GitHubError> {
        let mut state = self.state();
        state.record(HostCall::CreateCommit)?;
        let sha = state.next_sha();
        state.commits.insert(
            sha.clone(),
            StoredCommit {
                tree: tree.to_string(),
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        Ok(sha)
    }

    async fn update_ref(&self, repo: &RepoSlug, branch: &str, sha: &str) -> Result<(), GitHubError> {
        let mut state = self.state();
        state.record(HostCall::UpdateRef)?;
        let current = state.branches.get(branch).cloned().ok_or_else(|| {
            GitHubError::NotFound {
                path: format!("{}/git/refs/heads/{}", repo.api_path(), branch),
            }
        })?;
        let fast_forward = state
            .commits
            .get(sha)
            .is_some_and(|c| c.parents.contains(&current));
        if !fast_forward {
            return Err(GitHubError::Api {
                status: 422,
                message: "Update is not a fast forward".to_string(),
            });
        }
        state.branches.insert(branch.to_string(), sha.to_string());
        state.push_auto_run(sha);
        Ok(())
    }
}

#[async_trait]
impl ActionsApi for MemoryHost {
    async fn list_runs(
        &self,
        _repo: &RepoSlug,
        filter: &RunFilter,
    ) -> Result<Vec<WorkflowRun>, GitHubError> {
        let mut state = self.state();
        state.listed_shas.push(filter.head_sha.clone());
        state.record(HostCall::ListRuns)?;
        Ok(state
            .runs
            .iter()
            .filter(|run| run.head_sha.as_deref() == Some(filter.head_sha.as_str()))
            .filter(|run| match &filter.event {
                Some(event) => run.event.as_deref() == Some(event.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get_run(&self, repo: &RepoSlug, run_id: u64) -> Result<WorkflowRun, GitHubError> {
        let mut state = self.state();
        state.record(HostCall::GetRun)?;
        if let Some(updates) = state.run_updates.get_mut(&run_id) {
            let next = if updates.len() > 1 {
                updates.pop_front()
            } else {
                updates.front().cloned()
            };
            if let Some(run) = next {
                return Ok(run);
            }
        }
        state
            .runs
            .iter()
            .find(|run| run.id == run_id)
            .cloned()
            .ok_or_else(|| GitHubError::NotFound {
                path: format!("{}/actions/runs/{}", repo.api_path(), run_id),
            })
    }

    async fn download_run_logs(
        &self,
        repo: &RepoSlug,
        run_id: u64,
    ) -> Result<Vec<u8>, GitHubError> {
        let mut state = self.state();
        state.record(HostCall::DownloadLogs)?;
        state
            .logs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| GitHubError::NotFound {
                path: format!("{}/actions/runs/{}/logs", repo.api_path(), run_id),
            })
    }
}

/// A finished run on `sha` with the given GitHub conclusion.
pub fn completed_run(id: u64, sha: &str, conclusion: &str) -> WorkflowRun {
    WorkflowRun {
        id,
        name: Some("CI".to_string()),
        head_sha: Some(sha.to_string()),
        event: Some("push".to_string()),
        status: Some("completed".to_string()),
        conclusion: Some(conclusion.to_string()),
        html_url: Some(format!("https://github.com/octo/site/actions/runs/{}", id)),
        run_started_at: Some(format!("2024-05-01T10:{:02}:00Z", id % 60)),
        created_at: None,
    }
}

/// A run on `sha` that has not finished yet.
pub fn running_run(id: u64, sha: &str) -> WorkflowRun {
    WorkflowRun {
        status: Some("in_progress".to_string()),
        conclusion: None,
        ..completed_run(id, sha, "")
    }
}

/// Build a log archive the way GitHub ships it: one text file per step.
pub fn zip_logs(files: &[(&str, &str)]) -> Vec<u8> {
    build_zip(files, zip::CompressionMethod::Deflated)
}

/// Uncompressed archive, so entry payloads can be located and damaged.
pub fn stored_zip_logs(files: &[(&str, &str)]) -> Vec<u8> {
    build_zip(files, zip::CompressionMethod::Stored)
}

/// Flip one bit of the first occurrence of `payload`, breaking that entry's CRC.
pub fn corrupt_payload(archive: &mut [u8], payload: &str) {
    let needle = payload.as_bytes();
    let at = archive
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap();
    archive[at] ^= 0x01;
}

fn build_zip(files: &[(&str, &str)], method: zip::CompressionMethod) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default().compression_method(method);
    for (name, text) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(text.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
