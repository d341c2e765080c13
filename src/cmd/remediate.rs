//! Full commit / build / fix loop (`autofix remediate`).

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use autofix::autofix_config::AutofixConfig;
use autofix::ci::BuildWaiter;
use autofix::remediation::{CommandAgent, Remediator};

use super::{github_client, load_operations};

pub async fn cmd_remediate(
    config: &AutofixConfig,
    repo: &str,
    spec_file: &Path,
    ops_file: &Path,
    max_rounds: Option<u32>,
) -> Result<()> {
    let repo = config.resolve_repo(repo)?;
    let specification = std::fs::read_to_string(spec_file)
        .with_context(|| format!("Failed to read spec file: {}", spec_file.display()))?;
    let ops = load_operations(ops_file)?;
    let client = Arc::new(github_client(config)?);

    let agent = CommandAgent::new(
        config.toml.agent_cmd(),
        config.toml.remediation.agent_args.clone(),
    )
    .with_working_dir(&config.project_dir);

    let mut remediation = config.toml.remediation_config();
    if let Some(rounds) = max_rounds {
        remediation.max_fix_rounds = rounds;
    }

    let waiter = BuildWaiter::start(client.clone());
    let remediator = Remediator::new(client, waiter.clone(), Arc::new(agent), remediation);
    let outcome = remediator.remediate(&specification, &ops, &repo).await;
    waiter.shutdown();

    let sha = outcome?;
    println!("{}", sha);
    Ok(())
}
