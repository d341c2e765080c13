use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::agent::CodeAgent;
use super::prompt::FixRequest;
use crate::ci::{BuildWaiter, WatchOptions, WorkflowResult};
use crate::errors::RemediationError;
use crate::github::{GitDataApi, RepoSlug};
use crate::repo::{
    CommitBuilder, DEFAULT_BRANCH, DEFAULT_BRANCH_WAIT, FileOperation, parse_operations,
};

pub const DEFAULT_MAX_FIX_ROUNDS: u32 = 5;
pub const DEFAULT_ROLE: &str = "Developer";

#[derive(Debug, Clone)]
pub struct RemediationConfig {
    /// Fix rounds attempted after the initial build fails.
    pub max_fix_rounds: u32,
    /// Role the agent is addressed as in fix prompts.
    pub role: String,
    pub branch: String,
    pub branch_wait: Duration,
    pub watch: WatchOptions,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            max_fix_rounds: DEFAULT_MAX_FIX_ROUNDS,
            role: DEFAULT_ROLE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            branch_wait: DEFAULT_BRANCH_WAIT,
            watch: WatchOptions::default(),
        }
    }
}

/// Where a remediation run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Committing,
    Waiting,
    Fixing,
    Succeeded,
    ExhaustedRetries,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Committing => "committing",
            Stage::Waiting => "waiting",
            Stage::Fixing => "fixing",
            Stage::Succeeded => "succeeded",
            Stage::ExhaustedRetries => "exhausted_retries",
        };
        f.write_str(name)
    }
}

/// Drives commit, build and fix rounds until the build is green or the fix
/// budget runs out.
pub struct Remediator {
    git: Arc<dyn GitDataApi>,
    waiter: BuildWaiter,
    agent: Arc<dyn CodeAgent>,
    config: RemediationConfig,
}

impl Remediator {
    pub fn new(
        git: Arc<dyn GitDataApi>,
        waiter: BuildWaiter,
        agent: Arc<dyn CodeAgent>,
        config: RemediationConfig,
    ) -> Self {
        Self {
            git,
            waiter,
            agent,
            config,
        }
    }

    pub fn config(&self) -> &RemediationConfig {
        &self.config
    }

    /// Commit `initial_ops` and keep fixing until CI passes.
    ///
    /// Returns the sha of the first commit whose build succeeded. A failed
    /// commit ends the run at once without using up a fix round.
    pub async fn remediate(
        &self,
        specification: &str,
        initial_ops: &[FileOperation],
        repo: &RepoSlug,
    ) -> Result<String, RemediationError> {
        let committer = CommitBuilder::new(Arc::clone(&self.git), repo.clone())
            .with_branch(self.config.branch.clone())
            .with_branch_wait(self.config.branch_wait);
        let max_rounds = self.config.max_fix_rounds;

        let sha = self
            .commit(&committer, initial_ops, "autofix: apply generated changes", None)
            .await?;
        let mut build = self.build(repo, &sha).await;
        if build.ok {
            info!(repo = %repo, sha = %sha, stage = %Stage::Succeeded, "build passed");
            return Ok(sha);
        }

        for round in 1..=max_rounds {
            info!(
                repo = %repo,
                round,
                max_rounds,
                conclusion = %build.conclusion,
                stage = %Stage::Fixing,
                "build failed, requesting fix"
            );
            let request = FixRequest {
                specification: specification.to_string(),
                role: self.config.role.clone(),
                round,
                max_rounds,
                diagnostic: Arc::clone(&build),
            };

            let answer = self.agent.generate(&request).await.map_err(|e| {
                failed(format!("Agent failed in fix round {}: {:#}", round, e), &build)
            })?;
            let ops = parse_operations(&answer).map_err(|e| {
                failed(
                    format!("Unusable agent answer in fix round {}: {}", round, e),
                    &build,
                )
            })?;
            if ops.is_empty() {
                warn!(repo = %repo, round, "agent proposed no file changes");
            }

            let message = format!("autofix: fix round {}", round);
            let sha = self
                .commit(&committer, &ops, &message, Some(build.as_ref()))
                .await?;
            build = self.build(repo, &sha).await;
            if build.ok {
                info!(repo = %repo, sha = %sha, round, stage = %Stage::Succeeded, "build passed");
                return Ok(sha);
            }
        }

        warn!(repo = %repo, max_rounds, stage = %Stage::ExhaustedRetries, "giving up");
        Err(RemediationError::BuildFailed {
            reason: format!(
                "Build still failing after {} fix rounds. Last run: {}, conclusion={}",
                max_rounds,
                build.run_url.as_deref().unwrap_or("none"),
                build.conclusion
            ),
            run_url: build.run_url.clone(),
            conclusion: Some(build.conclusion),
        })
    }

    async fn commit(
        &self,
        committer: &CommitBuilder,
        ops: &[FileOperation],
        message: &str,
        last_build: Option<&WorkflowResult>,
    ) -> Result<String, RemediationError> {
        info!(repo = %committer.repo(), files = ops.len(), stage = %Stage::Committing, "committing");
        committer.commit(ops, message).await.map_err(|e| {
            let reason = format!("Commit failed: {}", e);
            match last_build {
                Some(build) => failed(reason, build),
                None => RemediationError::build_failed(reason),
            }
        })
    }

    async fn build(&self, repo: &RepoSlug, sha: &str) -> Arc<WorkflowResult> {
        info!(repo = %repo, sha = %sha, stage = %Stage::Waiting, "waiting for build");
        self.waiter
            .submit(repo.clone(), sha, self.config.watch.clone())
            .await
    }
}

fn failed(reason: String, last_build: &WorkflowResult) -> RemediationError {
    RemediationError::BuildFailed {
        reason,
        run_url: last_build.run_url.clone(),
        conclusion: Some(last_build.conclusion),
    }
}
