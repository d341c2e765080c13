use regex::Regex;
use std::sync::LazyLock;

use super::EMPTY_LOGS_SENTINEL;
use super::archive::LogFile;

/// Lines of context kept on each side of the last marker hit.
const CONTEXT_LINES: usize = 50;

/// Lines kept from the end of the longest file when nothing matched.
const TAIL_LINES: usize = 120;

/// Error markers across CI runners and common toolchains. Matched per line.
static ERROR_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(##\[error\]|traceback\b|exception\b|fatal\b|^\s*error\b|npm ERR!",
        r"|yarn .*error|gradle.*failed|failed\b|build\s+failed|compilation\s+failed",
        r"|segmentation fault|error\[E\d+\]|error TS\d+|panicked at)",
    ))
    .unwrap()
});

struct Candidate<'a> {
    name: &'a str,
    snippet: String,
    score: usize,
}

fn best_snippet(file: &LogFile) -> Option<Candidate<'_>> {
    let lines: Vec<&str> = file.text.lines().collect();
    let hits: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| ERROR_MARKERS.is_match(line))
        .map(|(idx, _)| idx)
        .collect();
    let last = *hits.last()?;

    let start = last.saturating_sub(CONTEXT_LINES);
    let end = (last + CONTEXT_LINES).min(lines.len() - 1);
    let snippet = lines[start..=end].join("\n").trim().to_string();

    let name_bonus = if file.name.to_lowercase().contains("error") {
        100
    } else {
        0
    };
    let score = hits.len() * 1000 + name_bonus + snippet.chars().count() / 200;

    Some(Candidate {
        name: &file.name,
        snippet,
        score,
    })
}

/// Pick the most relevant error excerpt from unpacked log files.
///
/// Each file contributes the window around its last marker hit, scored by
/// hit count, an `error` filename bonus and snippet length; the first file
/// wins ties. Without any hit the tail of the longest file is returned.
pub fn extract_error_snippet(files: &[LogFile]) -> String {
    let mut best: Option<Candidate<'_>> = None;
    for candidate in files.iter().filter_map(best_snippet) {
        if best.as_ref().is_none_or(|b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    if let Some(best) = best {
        return format!("===== {} =====\n{}", best.name, best.snippet);
    }

    let mut longest: Option<&LogFile> = None;
    for file in files {
        if longest.is_none_or(|l| file.text.chars().count() > l.text.chars().count()) {
            longest = Some(file);
        }
    }
    match longest {
        Some(file) => {
            let lines: Vec<&str> = file.text.lines().collect();
            let tail = &lines[lines.len().saturating_sub(TAIL_LINES)..];
            format!("===== {} (tail) =====\n{}", file.name, tail.join("\n"))
        }
        None => EMPTY_LOGS_SENTINEL.to_string(),
    }
}
