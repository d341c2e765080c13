//! Watching one commit's CI run from discovery to conclusion.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::job::BuildJob;
use super::result::{Conclusion, WorkflowResult};
use crate::diagnostics;
use crate::errors::GitHubError;
use crate::github::{ActionsApi, WorkflowRun};
use crate::util::deadline_after;

/// Lower bound on the poll interval so a zero setting cannot spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Choose the run to follow among the runs listed for a commit.
///
/// Runs are narrowed to those whose workflow name contains `workflow_name`
/// (case-insensitive). A run that has not completed is preferred; otherwise
/// the most recently started run wins, the earlier one on equal start times.
pub fn select_run<'a>(
    runs: &'a [WorkflowRun],
    workflow_name: Option<&str>,
) -> Option<&'a WorkflowRun> {
    let needle = workflow_name
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty());
    let candidates: Vec<&WorkflowRun> = runs
        .iter()
        .filter(|run| match &needle {
            Some(needle) => run
                .name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(needle.as_str())),
            None => true,
        })
        .collect();

    if let Some(active) = candidates.iter().find(|run| !run.is_completed()) {
        return Some(*active);
    }

    let mut latest: Option<&WorkflowRun> = None;
    for run in candidates {
        if latest.is_none_or(|l| run.started_at() > l.started_at()) {
            latest = Some(run);
        }
    }
    latest
}

/// Sleep until the next poll. Returns `false` without sleeping once the
/// deadline has passed.
async fn pause(deadline: Instant, poll: Duration) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    sleep(poll.min(deadline - now)).await;
    true
}

fn api_failure(what: &str, err: &GitHubError) -> WorkflowResult {
    WorkflowResult::monitor_error(format!("{}: {}", what, err))
}

/// Watch the build for `job.commit_sha` until it concludes or times out.
///
/// Transient API failures are retried on the next tick; any other API
/// failure ends the watch with `monitor_error`.
pub async fn watch_build(api: &dyn ActionsApi, job: &BuildJob) -> WorkflowResult {
    let options = &job.options;
    let poll = options.poll_interval.max(MIN_POLL_INTERVAL);
    let deadline = deadline_after(options.timeout);
    let filter = job.run_filter();

    let mut run = loop {
        match api.list_runs(&job.repo, &filter).await {
            Ok(runs) => {
                if let Some(run) = select_run(&runs, options.workflow_name.as_deref()) {
                    break run.clone();
                }
                debug!(repo = %job.repo, sha = %job.commit_sha, "no workflow run yet");
            }
            Err(e) if e.is_transient() => {
                warn!(repo = %job.repo, sha = %job.commit_sha, error = %e, "listing workflow runs failed, retrying");
            }
            Err(e) => return api_failure("failed to list workflow runs", &e),
        }
        if !pause(deadline, poll).await {
            return WorkflowResult::timeout(
                None,
                format!(
                    "no workflow run appeared for {} within {}s",
                    job.commit_sha,
                    options.timeout.as_secs()
                ),
            );
        }
    };

    info!(
        repo = %job.repo,
        sha = %job.commit_sha,
        run_id = run.id,
        workflow = run.name.as_deref().unwrap_or(""),
        "workflow run discovered"
    );

    while !run.is_completed() {
        if !pause(deadline, poll).await {
            return WorkflowResult::timeout(
                Some(&run),
                format!(
                    "workflow run {} did not complete within {}s",
                    run.id,
                    options.timeout.as_secs()
                ),
            );
        }
        match api.get_run(&job.repo, run.id).await {
            Ok(latest) => run = latest,
            Err(e) if e.is_transient() => {
                warn!(run_id = run.id, error = %e, "polling workflow run failed, retrying");
            }
            Err(e) => return api_failure("failed to poll workflow run", &e),
        }
    }

    let conclusion = Conclusion::from_github(run.conclusion.as_deref().unwrap_or(""));
    info!(run_id = run.id, conclusion = %conclusion, "workflow run completed");
    if conclusion == Conclusion::Success {
        return WorkflowResult::success(&run);
    }

    match api.download_run_logs(&job.repo, run.id).await {
        Ok(archive) => {
            let error_text = diagnostics::extract(&archive, options.max_log_chars);
            let logs_text = if options.include_raw_logs {
                diagnostics::raw_logs(&archive, options.max_log_chars)
            } else {
                None
            };
            WorkflowResult::failed(&run, conclusion, error_text, logs_text)
        }
        Err(e) => {
            warn!(run_id = run.id, error = %e, "downloading run logs failed");
            WorkflowResult::failed(
                &run,
                conclusion,
                format!("failed to download logs for run {}: {}", run.id, e),
                None,
            )
        }
    }
}
