//! Wire types for the GitHub REST endpoints (subset of fields we care about).

use serde::{Deserialize, Serialize};

/// A GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// A git reference such as `refs/heads/main`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: GitObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitObject {
    pub sha: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// A git commit object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub tree: ShaRef,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub parents: Vec<ShaRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaRef {
    pub sha: String,
}

/// One entry of a tree being created. `sha: None` serializes as `null`,
/// which removes the path from the base tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: Option<String>,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".to_string(),
            kind: "blob".to_string(),
            sha: Some(sha.into()),
        }
    }

    pub fn removal(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".to_string(),
            kind: "blob".to_string(),
            sha: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewBlob<'a> {
    pub content: &'a str,
    pub encoding: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTree<'a> {
    pub base_tree: &'a str,
    pub tree: &'a [TreeEntry],
}

#[derive(Debug, Serialize)]
pub(crate) struct NewCommit<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct RefUpdate<'a> {
    pub sha: &'a str,
    pub force: bool,
}

/// Response body of the create-blob/tree/commit endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedObject {
    pub sha: String,
}

/// One GitHub Actions workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub head_sha: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub run_started_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl WorkflowRun {
    pub fn is_completed(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("completed"))
    }

    /// ISO-8601 start time, compared lexicographically.
    pub fn started_at(&self) -> &str {
        self.run_started_at
            .as_deref()
            .or(self.created_at.as_deref())
            .unwrap_or("")
    }
}

/// Response body of the list-runs endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowRunsPage {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// Query for the list-runs endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFilter {
    pub head_sha: String,
    pub per_page: u32,
    pub event: Option<String>,
}

impl RunFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("head_sha", self.head_sha.clone()),
            ("per_page", self.per_page.clamp(1, 100).to_string()),
        ];
        if let Some(event) = &self.event {
            pairs.push(("event", event.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_entry_serializes_null_sha() {
        let entry = TreeEntry::removal("src/old.rs");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["path"], "src/old.rs");
        assert_eq!(json["mode"], "100644");
        assert_eq!(json["type"], "blob");
        assert!(json["sha"].is_null());
        assert!(json.as_object().unwrap().contains_key("sha"));
    }

    #[test]
    fn test_git_ref_deserialize() {
        let json = r#"{
            "ref": "refs/heads/main",
            "node_id": "REF_x",
            "object": {"sha": "aa218f56b14c9653891f9e74264a383fa43fefbd", "type": "commit"}
        }"#;
        let git_ref: GitRef = serde_json::from_str(json).unwrap();
        assert_eq!(git_ref.name, "refs/heads/main");
        assert_eq!(git_ref.object.sha, "aa218f56b14c9653891f9e74264a383fa43fefbd");
        assert_eq!(git_ref.object.kind.as_deref(), Some("commit"));
    }

    #[test]
    fn test_workflow_run_deserialize_in_progress() {
        let json = r#"{
            "id": 30433642,
            "name": "Build",
            "head_sha": "acb5820ced9479c074f688cc328bf03f341a511d",
            "event": "push",
            "status": "in_progress",
            "conclusion": null,
            "html_url": "https://github.com/octo-org/octo-repo/actions/runs/30433642",
            "created_at": "2024-01-22T19:33:08Z",
            "run_started_at": "2024-01-22T19:33:09Z"
        }"#;
        let run: WorkflowRun = serde_json::from_str(json).unwrap();
        assert_eq!(run.id, 30433642);
        assert!(!run.is_completed());
        assert!(run.conclusion.is_none());
        assert_eq!(run.started_at(), "2024-01-22T19:33:09Z");
    }

    #[test]
    fn test_workflow_run_started_at_falls_back_to_created_at() {
        let run = WorkflowRun {
            id: 1,
            created_at: Some("2024-01-22T19:33:08Z".to_string()),
            ..Default::default()
        };
        assert_eq!(run.started_at(), "2024-01-22T19:33:08Z");
        assert_eq!(WorkflowRun::default().started_at(), "");
    }

    #[test]
    fn test_run_filter_clamps_per_page_and_adds_event() {
        let filter = RunFilter {
            head_sha: "abc".to_string(),
            per_page: 500,
            event: Some("push".to_string()),
        };
        let pairs = filter.query_pairs();
        assert!(pairs.contains(&("per_page", "100".to_string())));
        assert!(pairs.contains(&("event", "push".to_string())));

        let no_event = RunFilter {
            head_sha: "abc".to_string(),
            per_page: 0,
            event: None,
        };
        let pairs = no_event.query_pairs();
        assert!(pairs.contains(&("per_page", "1".to_string())));
        assert!(pairs.iter().all(|(k, _)| *k != "event"));
    }
}
