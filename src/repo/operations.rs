use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::OperationParseError;

/// What a file operation does. Content travels with the variants that need it,
/// so a delete can never carry content and a create can never lack it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Create(String),
    Update(String),
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// One file-level change to apply in a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOperation {
    path: String,
    change: FileChange,
}

impl FileOperation {
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            change: FileChange::Create(content.into()),
        }
    }

    pub fn update(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            change: FileChange::Update(content.into()),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            change: FileChange::Delete,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn change(&self) -> &FileChange {
        &self.change
    }

    pub fn kind(&self) -> OperationKind {
        match self.change {
            FileChange::Create(_) => OperationKind::Create,
            FileChange::Update(_) => OperationKind::Update,
            FileChange::Delete => OperationKind::Delete,
        }
    }

    /// File content; `None` exactly when the operation is a delete.
    pub fn content(&self) -> Option<&str> {
        match &self.change {
            FileChange::Create(content) | FileChange::Update(content) => Some(content),
            FileChange::Delete => None,
        }
    }
}

/// Loose JSON shape emitted by code agents and accepted on the CLI:
/// `{"path": "...", "content": "...", "op": "create|update|delete"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFileOperation {
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub op: Option<String>,
}

impl RawFileOperation {
    /// Validate into a `FileOperation`. A missing `op` falls back to
    /// `default_kind`; content sent along with a delete is dropped.
    pub fn into_operation(
        self,
        default_kind: OperationKind,
    ) -> Result<FileOperation, OperationParseError> {
        let path = self.path.trim().trim_start_matches('/').to_string();
        if path.is_empty() {
            return Err(OperationParseError::EmptyPath);
        }

        let kind = match self.op.as_deref().map(|op| op.trim().to_lowercase()) {
            None => default_kind,
            Some(op) => match parse_kind(&op) {
                Some(kind) => kind,
                None => return Err(OperationParseError::UnknownOp { op, path }),
            },
        };

        match (kind, self.content) {
            (OperationKind::Delete, _) => Ok(FileOperation::delete(path)),
            (_, None) => Err(OperationParseError::MissingContent { path }),
            (OperationKind::Create, Some(content)) => Ok(FileOperation::create(path, content)),
            (OperationKind::Update, Some(content)) => Ok(FileOperation::update(path, content)),
        }
    }
}

fn parse_kind(op: &str) -> Option<OperationKind> {
    match op {
        "create" | "add" => Some(OperationKind::Create),
        "update" | "modify" => Some(OperationKind::Update),
        "delete" | "remove" => Some(OperationKind::Delete),
        _ => None,
    }
}

impl From<&FileOperation> for RawFileOperation {
    fn from(op: &FileOperation) -> Self {
        Self {
            path: op.path().to_string(),
            content: op.content().map(str::to_string),
            op: Some(op.kind().to_string()),
        }
    }
}
