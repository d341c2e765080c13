use std::fmt;

use serde::{Deserialize, Serialize};

use crate::github::WorkflowRun;

/// Outcome of watching one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    /// The run did not appear or finish before the watch deadline.
    Timeout,
    /// The watch itself broke (non-retryable API error, crashed watch, shutdown).
    MonitorError,
    /// Nothing to watch: the commit sha was empty.
    NoSha,
    Unknown,
}

impl Conclusion {
    /// Map a GitHub Actions run conclusion.
    pub fn from_github(conclusion: &str) -> Self {
        match conclusion.trim().to_ascii_lowercase().as_str() {
            "success" => Conclusion::Success,
            "failure" | "startup_failure" => Conclusion::Failure,
            "cancelled" => Conclusion::Cancelled,
            "timed_out" => Conclusion::Timeout,
            _ => Conclusion::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Cancelled => "cancelled",
            Conclusion::Timeout => "timeout",
            Conclusion::MonitorError => "monitor_error",
            Conclusion::NoSha => "no_sha",
            Conclusion::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one build watch, shared by every caller waiting on the same commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub ok: bool,
    pub conclusion: Conclusion,
    pub run_id: Option<u64>,
    pub run_url: Option<String>,
    pub workflow_name: Option<String>,
    pub error_text: Option<String>,
    pub logs_text: Option<String>,
}

impl WorkflowResult {
    fn bare(conclusion: Conclusion, error_text: Option<String>) -> Self {
        Self {
            ok: false,
            conclusion,
            run_id: None,
            run_url: None,
            workflow_name: None,
            error_text,
            logs_text: None,
        }
    }

    fn for_run(run: &WorkflowRun, conclusion: Conclusion) -> Self {
        Self {
            ok: conclusion == Conclusion::Success,
            conclusion,
            run_id: Some(run.id),
            run_url: run.html_url.clone(),
            workflow_name: run.name.clone(),
            error_text: None,
            logs_text: None,
        }
    }

    pub fn success(run: &WorkflowRun) -> Self {
        Self::for_run(run, Conclusion::Success)
    }

    /// A completed run that did not succeed, with its extracted diagnostic.
    pub fn failed(
        run: &WorkflowRun,
        conclusion: Conclusion,
        error_text: String,
        logs_text: Option<String>,
    ) -> Self {
        Self {
            ok: false,
            error_text: Some(error_text),
            logs_text,
            ..Self::for_run(run, conclusion)
        }
    }

    /// The deadline passed; `run` is the last state seen, if a run was found.
    pub fn timeout(run: Option<&WorkflowRun>, message: impl Into<String>) -> Self {
        let mut result = match run {
            Some(run) => Self::for_run(run, Conclusion::Timeout),
            None => Self::bare(Conclusion::Timeout, None),
        };
        result.ok = false;
        result.error_text = Some(message.into());
        result
    }

    pub fn monitor_error(message: impl Into<String>) -> Self {
        Self::bare(Conclusion::MonitorError, Some(message.into()))
    }

    pub fn no_sha() -> Self {
        Self::bare(
            Conclusion::NoSha,
            Some("no commit sha to watch".to_string()),
        )
    }

    /// Text handed to the code agent: the diagnostic, or the conclusion when
    /// no diagnostic was captured.
    pub fn diagnostic(&self) -> &str {
        self.error_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| self.conclusion.as_str())
    }
}
