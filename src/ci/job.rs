use std::time::Duration;

use crate::github::{RepoSlug, RunFilter};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);
pub const DEFAULT_MAX_LOG_CHARS: usize = 200_000;
pub const DEFAULT_PER_PAGE: u32 = 50;

/// How one build is watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Character budget for unpacked log text.
    pub max_log_chars: usize,
    /// Also return every unpacked log file in `WorkflowResult::logs_text`.
    pub include_raw_logs: bool,
    pub per_page: u32,
    /// Only consider runs triggered by this event (e.g. `push`).
    pub event: Option<String>,
    /// Only consider runs whose workflow name contains this, case-insensitively.
    pub workflow_name: Option<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            max_log_chars: DEFAULT_MAX_LOG_CHARS,
            include_raw_logs: false,
            per_page: DEFAULT_PER_PAGE,
            event: None,
            workflow_name: None,
        }
    }
}

/// One queued watch request.
#[derive(Debug, Clone)]
pub struct BuildJob {
    pub repo: RepoSlug,
    pub commit_sha: String,
    pub options: WatchOptions,
}

impl BuildJob {
    pub fn run_filter(&self) -> RunFilter {
        RunFilter {
            head_sha: self.commit_sha.clone(),
            per_page: self.options.per_page.clamp(1, 100),
            event: self.options.event.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = WatchOptions::default();
        assert_eq!(options.poll_interval, Duration::from_secs(120));
        assert_eq!(options.timeout, Duration::from_secs(900));
        assert_eq!(options.max_log_chars, 200_000);
        assert_eq!(options.per_page, 50);
        assert!(!options.include_raw_logs);
    }

    #[test]
    fn test_run_filter_uses_sha_and_clamped_page() {
        let job = BuildJob {
            repo: RepoSlug::new("o", "r"),
            commit_sha: "abc123".to_string(),
            options: WatchOptions {
                per_page: 0,
                event: Some("push".to_string()),
                ..Default::default()
            },
        };
        let filter = job.run_filter();
        assert_eq!(filter.head_sha, "abc123");
        assert_eq!(filter.per_page, 1);
        assert_eq!(filter.event.as_deref(), Some("push"));
    }
}
