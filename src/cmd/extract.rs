use anyhow::{Context, Result};
use std::path::Path;

use autofix::autofix_config::AutofixConfig;
use autofix::diagnostics;

pub fn cmd_extract(
    config: &AutofixConfig,
    archive: &Path,
    max_chars: Option<usize>,
    raw: bool,
) -> Result<()> {
    let bytes = std::fs::read(archive)
        .with_context(|| format!("Failed to read log archive: {}", archive.display()))?;
    let max_chars = max_chars.unwrap_or(config.toml.build.max_log_chars);

    if raw {
        let logs = diagnostics::raw_logs(&bytes, max_chars)
            .with_context(|| format!("{} is not a readable zip archive", archive.display()))?;
        println!("{}", logs);
    } else {
        println!("{}", diagnostics::extract(&bytes, max_chars));
    }
    Ok(())
}
