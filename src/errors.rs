//! Typed error hierarchy for the autofix engine.
//!
//! Four top-level enums cover the four failure surfaces:
//! - `GitHubError`: a single REST call to the VCS host failed
//! - `CommitError`: the commit builder could not advance the branch
//! - `OperationParseError`: agent output could not be turned into file operations
//! - `RemediationError`: the only error that crosses the orchestrator boundary
//!
//! CI failures and watch timeouts are not errors: they are reported through
//! `WorkflowResult::conclusion`.

use thiserror::Error;

use crate::ci::Conclusion;
use crate::github::RepoSlug;

/// Errors from one call against the GitHub REST API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("GitHub resource not found: {path}")]
    NotFound { path: String },

    #[error("GitHub API {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid GitHub client configuration: {0}")]
    Config(String),
}

impl GitHubError {
    /// Network failures, rate limiting and server-side errors are worth
    /// retrying on the next poll tick.
    pub fn is_transient(&self) -> bool {
        match self {
            GitHubError::Transport(_) => true,
            GitHubError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The host answers 404 for a branch that does not exist yet and 409 for
    /// a repository whose default branch has not been initialised.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            GitHubError::NotFound { .. } | GitHubError::Api { status: 409, .. }
        )
    }
}

/// Errors from building and publishing a commit.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Repository {repo} does not exist or is not initialized")]
    RepoNotInitialized { repo: RepoSlug },

    #[error("Branch '{branch}' did not appear within {waited_ms}ms")]
    BranchNotFound { branch: String, waited_ms: u128 },

    #[error(transparent)]
    Transport(#[from] GitHubError),
}

/// Errors from parsing agent output into file operations.
#[derive(Debug, Error)]
pub enum OperationParseError {
    #[error("Malformed JSON in {command} block: {source}")]
    MalformedJson {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Operation on '{path}' requires content")]
    MissingContent { path: String },

    #[error("Unknown operation '{op}' for '{path}'")]
    UnknownOp { op: String, path: String },

    #[error("File operation has an empty path")]
    EmptyPath,
}

/// The permanent failure surfaced by the remediation loop.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("{reason}")]
    BuildFailed {
        reason: String,
        run_url: Option<String>,
        conclusion: Option<Conclusion>,
    },
}

impl RemediationError {
    pub fn build_failed(reason: impl Into<String>) -> Self {
        RemediationError::BuildFailed {
            reason: reason.into(),
            run_url: None,
            conclusion: None,
        }
    }
}
