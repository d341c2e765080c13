use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use autofix::autofix_config::AutofixConfig;
use autofix::ci::BuildWaiter;

use super::github_client;

/// Watch one build and print its result as JSON. Returns whether it passed.
pub async fn cmd_watch(
    config: &AutofixConfig,
    repo: &str,
    sha: &str,
    raw_logs: bool,
    timeout: Option<u64>,
) -> Result<bool> {
    let repo = config.resolve_repo(repo)?;
    let client = Arc::new(github_client(config)?);

    let mut options = config.toml.watch_options();
    options.include_raw_logs |= raw_logs;
    if let Some(secs) = timeout {
        options.timeout = Duration::from_secs(secs);
    }

    let waiter = BuildWaiter::start(client);
    let result = waiter.submit(repo, sha, options).await;
    waiter.shutdown();

    println!("{}", serde_json::to_string_pretty(result.as_ref())?);
    Ok(result.ok)
}
