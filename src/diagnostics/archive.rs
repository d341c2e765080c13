use std::io::{Cursor, Read};

use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipResult;

use crate::util::truncate_chars;

/// One text log file taken out of a CI log archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub name: String,
    pub text: String,
}

fn is_log_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".txt") || lower.ends_with(".log")
}

/// Unpack the `.txt`/`.log` entries of a zip archive in name order.
///
/// Content is decoded as lossy UTF-8. At most `max_total_chars` characters
/// are kept overall: the file that crosses the budget is truncated and
/// unpacking stops there. An entry that cannot be read (bad checksum,
/// unsupported compression) is skipped; only an unreadable archive is an error.
pub fn unpack_logs(archive: &[u8], max_total_chars: usize) -> ZipResult<Vec<LogFile>> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;

    let mut names: Vec<String> = zip
        .file_names()
        .filter(|name| is_log_file(name))
        .map(str::to_string)
        .collect();
    names.sort();

    let mut files = Vec::with_capacity(names.len());
    let mut used = 0usize;
    for name in names {
        if used >= max_total_chars {
            break;
        }
        let mut bytes = Vec::new();
        let read = zip
            .by_name(&name)
            .map_err(std::io::Error::from)
            .and_then(|mut entry| entry.read_to_end(&mut bytes));
        if let Err(e) = read {
            debug!(file = %name, error = %e, "skipping unreadable log entry");
            continue;
        }
        let text = truncate_chars(&String::from_utf8_lossy(&bytes), max_total_chars - used);
        used += text.chars().count();
        files.push(LogFile { name, text });
    }
    Ok(files)
}

/// Concatenate files under `===== name =====` headers.
pub fn join_logs(files: &[LogFile]) -> String {
    files
        .iter()
        .map(|file| format!("===== {} =====\n{}", file.name, file.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
