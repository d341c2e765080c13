//! Turning a CI log archive into a short, actionable error excerpt.
//!
//! Everything here is pure: the same archive and budget always produce the
//! same text.

mod archive;
mod snippet;

use tracing::debug;

pub use archive::{LogFile, join_logs, unpack_logs};
pub use snippet::extract_error_snippet;

/// Returned when an archive holds nothing to diagnose.
pub const EMPTY_LOGS_SENTINEL: &str = "(logs are empty or contain no .txt/.log files)";

/// Extract the diagnostic from a zipped log archive.
///
/// An archive that cannot be read is treated like an empty one.
pub fn extract(archive: &[u8], max_total_chars: usize) -> String {
    match unpack_logs(archive, max_total_chars) {
        Ok(files) => extract_error_snippet(&files),
        Err(e) => {
            debug!(error = %e, "log archive is unreadable");
            EMPTY_LOGS_SENTINEL.to_string()
        }
    }
}

/// Every unpacked log file joined under name headers, or `None` if the
/// archive cannot be read.
pub fn raw_logs(archive: &[u8], max_total_chars: usize) -> Option<String> {
    unpack_logs(archive, max_total_chars)
        .ok()
        .map(|files| join_logs(&files))
}
