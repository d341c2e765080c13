//! Configuration view and validation commands (`autofix config`).

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use autofix::autofix_config::{AutofixConfig, AutofixToml, CONFIG_DIR, CONFIG_FILE, TOKEN_ENV_VARS};

    let autofix_dir = project_dir.join(CONFIG_DIR);
    let config_path = autofix_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Autofix Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No autofix.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            // Effective values include AUTOFIX_* environment overrides
            let config = AutofixConfig::new(project_dir.to_path_buf())?;
            let toml = &config.toml;

            println!("[github]");
            println!("  api_base = \"{}\"", toml.github.api_base);
            if let Some(owner) = &toml.github.owner {
                println!("  owner = \"{}\"", owner);
            }
            println!("  branch = \"{}\"", toml.github.branch);
            println!("  branch_wait_secs = {}", toml.github.branch_wait_secs);
            println!();

            println!("[build]");
            println!("  poll_interval_secs = {}", toml.build.poll_interval_secs);
            println!("  timeout_secs = {}", toml.build.timeout_secs);
            println!("  max_log_chars = {}", toml.build.max_log_chars);
            println!("  per_page = {}", toml.build.per_page);
            println!("  include_raw_logs = {}", toml.build.include_raw_logs);
            if let Some(event) = &toml.build.event {
                println!("  event = \"{}\"", event);
            }
            if let Some(name) = &toml.build.workflow_name {
                println!("  workflow_name = \"{}\"", name);
            }
            println!();

            println!("[remediation]");
            println!("  max_fix_rounds = {}", toml.remediation.max_fix_rounds);
            println!("  role = \"{}\"", toml.remediation.role);
            println!("  agent_cmd = \"{}\"", toml.agent_cmd());
            println!("  agent_args = {:?}", toml.remediation.agent_args);
            println!();

            let token = if config.github_token().is_ok() {
                "found"
            } else {
                "missing"
            };
            println!("GitHub token ({}): {}", TOKEN_ENV_VARS.join(" | "), token);
            println!();

            if !config_path.exists() {
                println!("Run 'autofix config init' to create an autofix.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No autofix.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = AutofixToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("autofix.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !autofix_dir.exists() {
                std::fs::create_dir_all(&autofix_dir)?;
            }

            let toml = AutofixToml::default();
            toml.save(&config_path)?;

            println!("Created autofix.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [github] owner, branch");
            println!("  - [build] poll_interval_secs, timeout_secs, event, workflow_name");
            println!("  - [remediation] max_fix_rounds, role, agent_cmd");
            println!();
        }
    }

    Ok(())
}
