//! Extraction of file operations from code-agent output.
//!
//! Agents answer with one or more command blocks:
//!
//! ````text
//! PUSH_FULL:
//! ```json
//! [{"path": "index.html", "content": "<html>...</html>"}]
//! ```
//! ````
//!
//! `PUSH_FULL` blocks describe a full project snapshot (default op: create)
//! and are merged into a single leading batch. `PUSH_PATCH` blocks describe
//! incremental edits (default op: update) and keep their order.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::operations::{FileOperation, OperationKind, RawFileOperation};
use crate::errors::OperationParseError;

static PUSH_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(PUSH_FULL|PUSH_PATCH):\s*```(?:json)?\s*([\s\S]*?)\s*```").unwrap()
});

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawFileOperation>),
    One(RawFileOperation),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<RawFileOperation> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Parse every `PUSH_FULL` / `PUSH_PATCH` block in `text`.
///
/// Text without any command block yields an empty list.
pub fn parse_operations(text: &str) -> Result<Vec<FileOperation>, OperationParseError> {
    let mut full = Vec::new();
    let mut patches = Vec::new();

    for cap in PUSH_BLOCK_REGEX.captures_iter(text) {
        let command = cap[1].to_uppercase();
        let (default_kind, target) = if command == "PUSH_FULL" {
            (OperationKind::Create, &mut full)
        } else {
            (OperationKind::Update, &mut patches)
        };

        let items: OneOrMany = serde_json::from_str(&cap[2])
            .map_err(|source| OperationParseError::MalformedJson { command, source })?;
        for raw in items.into_vec() {
            target.push(raw.into_operation(default_kind)?);
        }
    }

    full.extend(patches);
    Ok(full)
}

/// Parse a bare JSON document (object or array) of file operations, as used
/// by the CLI `--ops` files.
pub fn parse_operations_json(
    json: &str,
    default_kind: OperationKind,
) -> Result<Vec<FileOperation>, OperationParseError> {
    let items: OneOrMany =
        serde_json::from_str(json).map_err(|source| OperationParseError::MalformedJson {
            command: "operations".to_string(),
            source,
        })?;
    items
        .into_vec()
        .into_iter()
        .map(|raw| raw.into_operation(default_kind))
        .collect()
}
