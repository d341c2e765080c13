//! Configuration for autofix, read from `.autofix/autofix.toml`.
//!
//! Settings are layered: file, then environment, then CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [github]
//! api_base = "https://api.github.com"
//! owner = "octocat"
//! branch = "main"
//! branch_wait_secs = 5
//!
//! [build]
//! poll_interval_secs = 120
//! timeout_secs = 900
//! max_log_chars = 200000
//! per_page = 50
//! include_raw_logs = false
//! event = "push"
//! workflow_name = "CI"
//!
//! [remediation]
//! max_fix_rounds = 5
//! role = "Frontend"
//! agent_cmd = "claude"
//! agent_args = ["--print"]
//! ```
//!
//! The GitHub token is never read from the file. It comes from
//! `AUTOFIX_GITHUB_TOKEN`, `GH_PAT` or `GITHUB_TOKEN`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::ci::{
    DEFAULT_MAX_LOG_CHARS, DEFAULT_PER_PAGE, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, WatchOptions,
};
use crate::github::{DEFAULT_API_BASE, RepoSlug};
use crate::remediation::{DEFAULT_MAX_FIX_ROUNDS, DEFAULT_ROLE, RemediationConfig};
use crate::repo::{DEFAULT_BRANCH, DEFAULT_BRANCH_WAIT};

/// Environment variables checked for the GitHub token, in order.
pub const TOKEN_ENV_VARS: [&str; 3] = ["AUTOFIX_GITHUB_TOKEN", "GH_PAT", "GITHUB_TOKEN"];

pub const CONFIG_DIR: &str = ".autofix";
pub const CONFIG_FILE: &str = "autofix.toml";

/// VCS host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Owner used when a repository is given by name only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// How long to wait for the branch of a new repository to appear.
    #[serde(default = "default_branch_wait_secs")]
    pub branch_wait_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_branch_wait_secs() -> u64 {
    DEFAULT_BRANCH_WAIT.as_secs()
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            owner: None,
            branch: default_branch(),
            branch_wait_secs: default_branch_wait_secs(),
        }
    }
}

/// Build watch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_log_chars")]
    pub max_log_chars: usize,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub include_raw_logs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_max_log_chars() -> usize {
    DEFAULT_MAX_LOG_CHARS
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
            max_log_chars: default_max_log_chars(),
            per_page: default_per_page(),
            include_raw_logs: false,
            event: None,
            workflow_name: None,
        }
    }
}

/// Fix loop and code agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationSection {
    #[serde(default = "default_max_fix_rounds")]
    pub max_fix_rounds: u32,
    #[serde(default = "default_role")]
    pub role: String,
    /// Agent CLI (default: "claude")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_cmd: Option<String>,
    #[serde(default = "default_agent_args")]
    pub agent_args: Vec<String>,
}

fn default_max_fix_rounds() -> u32 {
    DEFAULT_MAX_FIX_ROUNDS
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

fn default_agent_args() -> Vec<String> {
    vec!["--print".to_string()]
}

impl Default for RemediationSection {
    fn default() -> Self {
        Self {
            max_fix_rounds: default_max_fix_rounds(),
            role: default_role(),
            agent_cmd: None,
            agent_args: default_agent_args(),
        }
    }
}

/// The complete autofix.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutofixToml {
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub remediation: RemediationSection,
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", name, value))
}

impl AutofixToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse autofix.toml")
    }

    /// Load `.autofix/autofix.toml`, or defaults if the file doesn't exist.
    pub fn load_or_default(autofix_dir: &Path) -> Result<Self> {
        let config_path = autofix_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize autofix.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `AUTOFIX_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply `AUTOFIX_*` overrides read through `lookup`.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("AUTOFIX_POLL_SECS") {
            self.build.poll_interval_secs = parse_env("AUTOFIX_POLL_SECS", &v)?;
        }
        if let Some(v) = lookup("AUTOFIX_TIMEOUT_SECS") {
            self.build.timeout_secs = parse_env("AUTOFIX_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("AUTOFIX_MAX_LOG_CHARS") {
            self.build.max_log_chars = parse_env("AUTOFIX_MAX_LOG_CHARS", &v)?;
        }
        if let Some(v) = lookup("AUTOFIX_MAX_FIX_ROUNDS") {
            self.remediation.max_fix_rounds = parse_env("AUTOFIX_MAX_FIX_ROUNDS", &v)?;
        }
        if let Some(v) = lookup("AUTOFIX_AGENT_CMD").filter(|v| !v.trim().is_empty()) {
            self.remediation.agent_cmd = Some(v.trim().to_string());
        }
        Ok(())
    }

    /// Get the agent command, defaulting to the claude CLI.
    pub fn agent_cmd(&self) -> String {
        self.remediation
            .agent_cmd
            .clone()
            .unwrap_or_else(|| "claude".to_string())
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            poll_interval: Duration::from_secs(self.build.poll_interval_secs),
            timeout: Duration::from_secs(self.build.timeout_secs),
            max_log_chars: self.build.max_log_chars,
            include_raw_logs: self.build.include_raw_logs,
            per_page: self.build.per_page,
            event: self.build.event.clone(),
            workflow_name: self.build.workflow_name.clone(),
        }
    }

    pub fn remediation_config(&self) -> RemediationConfig {
        RemediationConfig {
            max_fix_rounds: self.remediation.max_fix_rounds,
            role: self.remediation.role.clone(),
            branch: self.github.branch.clone(),
            branch_wait: Duration::from_secs(self.github.branch_wait_secs),
            watch: self.watch_options(),
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.build.poll_interval_secs == 0 {
            warnings.push("poll_interval_secs is 0: the run will be polled continuously".to_string());
        }
        if self.build.timeout_secs < self.build.poll_interval_secs {
            warnings.push(format!(
                "timeout_secs ({}) is shorter than poll_interval_secs ({}): a run will be checked at most twice",
                self.build.timeout_secs, self.build.poll_interval_secs
            ));
        }
        if !(1..=100).contains(&self.build.per_page) {
            warnings.push(format!(
                "per_page {} is outside 1..=100 and will be clamped",
                self.build.per_page
            ));
        }
        if self.build.max_log_chars == 0 {
            warnings.push("max_log_chars is 0: no log text will be extracted".to_string());
        }
        if self.remediation.max_fix_rounds == 0 {
            warnings.push("max_fix_rounds is 0: failed builds will not be fixed".to_string());
        }
        if self.github.branch.trim().is_empty() {
            warnings.push("github.branch is empty".to_string());
        }

        warnings
    }
}

/// Resolved runtime configuration: file, environment and CLI flags.
#[derive(Debug, Clone)]
pub struct AutofixConfig {
    pub project_dir: PathBuf,
    pub autofix_dir: PathBuf,
    pub toml: AutofixToml,
    pub verbose: bool,
}

impl AutofixConfig {
    /// Load configuration for `project_dir`, applying environment overrides.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let autofix_dir = project_dir.join(CONFIG_DIR);
        let mut toml = AutofixToml::load_or_default(&autofix_dir)?;
        toml.apply_env()?;

        Ok(Self {
            project_dir,
            autofix_dir,
            toml,
            verbose: false,
        })
    }

    pub fn with_cli_args(project_dir: PathBuf, verbose: bool) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.autofix_dir.join(CONFIG_FILE)
    }

    /// Read the GitHub token from the environment.
    pub fn github_token(&self) -> Result<String> {
        token_from(|name| std::env::var(name).ok())
    }

    /// Resolve a repository argument. A bare name is qualified with the
    /// configured `github.owner`.
    pub fn resolve_repo(&self, repo: &str) -> Result<RepoSlug> {
        resolve_repo(repo, self.toml.github.owner.as_deref())
    }
}

fn token_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .with_context(|| {
            format!(
                "No GitHub token found: set one of {}",
                TOKEN_ENV_VARS.join(", ")
            )
        })
}

fn resolve_repo(repo: &str, owner: Option<&str>) -> Result<RepoSlug> {
    let repo = repo.trim();
    match owner {
        Some(owner) if !repo.contains('/') && !repo.is_empty() => {
            Ok(RepoSlug::new(owner, repo))
        }
        _ => repo.parse(),
    }
}
