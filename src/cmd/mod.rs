//! CLI command implementations.
//!
//! | Module      | Commands handled |
//! |-------------|------------------|
//! | `commit`    | `Commit`         |
//! | `watch`     | `Watch`          |
//! | `extract`   | `Extract`        |
//! | `remediate` | `Remediate`      |
//! | `config`    | `Config`         |

pub mod commit;
pub mod config;
pub mod extract;
pub mod remediate;
pub mod watch;

pub use commit::cmd_commit;
pub use config::cmd_config;
pub use extract::cmd_extract;
pub use remediate::cmd_remediate;
pub use watch::cmd_watch;

use anyhow::{Context, Result};
use std::path::Path;

use autofix::autofix_config::AutofixConfig;
use autofix::github::GitHubClient;
use autofix::repo::{FileOperation, OperationKind, parse_operations, parse_operations_json};

fn github_client(config: &AutofixConfig) -> Result<GitHubClient> {
    let token = config.github_token()?;
    GitHubClient::new(&token, &config.toml.github.api_base).context("Failed to create GitHub client")
}

/// Read operations from a JSON file, or from saved agent output holding
/// `PUSH_FULL` / `PUSH_PATCH` blocks.
fn load_operations(path: &Path) -> Result<Vec<FileOperation>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read operations file: {}", path.display()))?;
    let trimmed = content.trim_start();
    let ops = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        parse_operations_json(&content, OperationKind::Create)
    } else {
        parse_operations(&content)
    };
    ops.with_context(|| format!("Invalid operations in {}", path.display()))
}
