//! Single atomic commit (`autofix commit`).

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use autofix::autofix_config::AutofixConfig;
use autofix::repo::CommitBuilder;

use super::{github_client, load_operations};

pub async fn cmd_commit(
    config: &AutofixConfig,
    repo: &str,
    ops_file: &Path,
    message: &str,
    branch: Option<&str>,
) -> Result<()> {
    let repo = config.resolve_repo(repo)?;
    let ops = load_operations(ops_file)?;
    let client = github_client(config)?;

    let github = &config.toml.github;
    let builder = CommitBuilder::new(Arc::new(client), repo.clone())
        .with_branch(branch.unwrap_or(&github.branch))
        .with_branch_wait(Duration::from_secs(github.branch_wait_secs));

    let sha = builder
        .commit(&ops, message)
        .await
        .with_context(|| format!("Failed to commit to {}", repo))?;

    println!("{}", sha);
    Ok(())
}
