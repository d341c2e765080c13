use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::debug;

use super::prompt::FixRequest;

/// A code-generation agent: prompt text in, answer text out.
///
/// The answer is expected to contain `PUSH_FULL:` / `PUSH_PATCH:` blocks.
#[async_trait]
pub trait CodeAgent: Send + Sync {
    async fn generate(&self, request: &FixRequest) -> Result<String>;
}

/// Runs an agent CLI, writing the prompt to its stdin and reading the answer
/// from stdout.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    cmd: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandAgent {
    pub fn new(cmd: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub async fn run(&self, prompt: &str) -> Result<String> {
        let mut cmd = Command::new(&self.cmd);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(cmd = %self.cmd, args = ?self.args, prompt_chars = prompt.len(), "spawning agent");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn agent command '{}'", self.cmd))?;

        // Written concurrently with draining stdout, so an agent that streams
        // output before reading all of its input cannot fill both pipes.
        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = prompt.to_string();
            tokio::spawn(async move { feed_stdin(&mut stdin, &prompt).await })
        });

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for agent process")?;

        if let Some(writer) = writer {
            match writer.await.context("Agent stdin writer failed")? {
                Ok(()) => {}
                // The agent may exit without reading its input; its exit status decides.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(cmd = %self.cmd, "agent closed stdin early");
                }
                Err(e) => return Err(e).context("Failed to write prompt to agent stdin"),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Agent exited with {}: {}", output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

async fn feed_stdin(stdin: &mut ChildStdin, prompt: &str) -> std::io::Result<()> {
    stdin.write_all(prompt.as_bytes()).await?;
    stdin.shutdown().await
}

#[async_trait]
impl CodeAgent for CommandAgent {
    async fn generate(&self, request: &FixRequest) -> Result<String> {
        self.run(&request.prompt()).await
    }
}
