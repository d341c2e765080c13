use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use autofix::autofix_config::AutofixConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "autofix")]
#[command(
    version,
    about = "Commit generated code, watch its CI build and feed failures back to a code agent"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Commit a set of file operations as a single commit
    Commit {
        /// Repository as owner/name (or name, with github.owner configured)
        #[arg(long)]
        repo: String,
        /// JSON file of operations, or agent output with PUSH_FULL/PUSH_PATCH blocks
        #[arg(long)]
        ops: PathBuf,
        #[arg(short, long, default_value = "autofix: apply changes")]
        message: String,
        /// Branch to commit to (overrides github.branch)
        #[arg(long)]
        branch: Option<String>,
    },
    /// Watch the CI build of a commit and print the result as JSON
    Watch {
        #[arg(long)]
        repo: String,
        #[arg(long)]
        sha: String,
        /// Include every unpacked log file in the result
        #[arg(long)]
        raw_logs: bool,
        /// Watch timeout in seconds (overrides build.timeout_secs)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Extract the error excerpt from a downloaded CI log archive
    Extract {
        /// Path to the logs zip
        archive: PathBuf,
        /// Character budget for unpacked logs (overrides build.max_log_chars)
        #[arg(long)]
        max_chars: Option<usize>,
        /// Print every log file instead of the excerpt
        #[arg(long)]
        raw: bool,
    },
    /// Commit, watch CI and have the agent fix failures until the build passes
    Remediate {
        #[arg(long)]
        repo: String,
        /// Project specification handed to the agent with every fix request
        #[arg(long)]
        spec: PathBuf,
        /// Initial operations (same formats as `commit --ops`)
        #[arg(long)]
        ops: PathBuf,
        /// Fix rounds after the first failed build (overrides remediation.max_fix_rounds)
        #[arg(long)]
        max_rounds: Option<u32>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default autofix.toml file
    Init,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_directive = if verbose { "autofix=debug" } else { "autofix=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&project_dir, command.clone());
    }

    let config = AutofixConfig::with_cli_args(project_dir, cli.verbose)?;
    match &cli.command {
        Commands::Commit {
            repo,
            ops,
            message,
            branch,
        } => cmd::cmd_commit(&config, repo, ops, message, branch.as_deref()).await?,
        Commands::Watch {
            repo,
            sha,
            raw_logs,
            timeout,
        } => {
            let ok = cmd::cmd_watch(&config, repo, sha, *raw_logs, *timeout).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Extract {
            archive,
            max_chars,
            raw,
        } => cmd::cmd_extract(&config, archive, *max_chars, *raw)?,
        Commands::Remediate {
            repo,
            spec,
            ops,
            max_rounds,
        } => cmd::cmd_remediate(&config, repo, spec, ops, *max_rounds).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
