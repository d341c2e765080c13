use std::sync::Arc;

use crate::ci::WorkflowResult;

/// Everything the code agent gets to repair a failing build.
#[derive(Debug, Clone)]
pub struct FixRequest {
    pub specification: String,
    pub role: String,
    /// 1-based fix round.
    pub round: u32,
    pub max_rounds: u32,
    pub diagnostic: Arc<WorkflowResult>,
}

impl FixRequest {
    /// Render the fix prompt sent to the agent.
    pub fn prompt(&self) -> String {
        let build = &self.diagnostic;
        let mut prompt = format!(
            "You are the {role} engineer on this project. The CI build for your last \
             commit failed (fix round {round} of {max}).\n\n",
            role = self.role,
            round = self.round,
            max = self.max_rounds,
        );

        prompt.push_str("## Specification\n\n");
        prompt.push_str(self.specification.trim());
        prompt.push_str("\n\n## Failed build\n\n");
        prompt.push_str(&format!("- Conclusion: {}\n", build.conclusion));
        if let Some(name) = &build.workflow_name {
            prompt.push_str(&format!("- Workflow: {}\n", name));
        }
        if let Some(url) = &build.run_url {
            prompt.push_str(&format!("- Run: {}\n", url));
        }

        prompt.push_str("\n## Diagnostic\n\n```\n");
        prompt.push_str(build.diagnostic());
        prompt.push_str("\n```\n\n");

        prompt.push_str(
            "## Instructions\n\n\
             Fix the root cause of the failure. Answer with the changed files only, \
             as one block in exactly this format:\n\n\
             PUSH_PATCH:\n\
             ```json\n\
             [{\"path\": \"relative/path\", \"content\": \"full new file content\"},\n \
             {\"path\": \"obsolete/file\", \"op\": \"delete\"}]\n\
             ```\n",
        );
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::Conclusion;
    use crate::repo::parse_operations;

    fn failed_build() -> Arc<WorkflowResult> {
        Arc::new(WorkflowResult {
            ok: false,
            conclusion: Conclusion::Failure,
            run_id: Some(42),
            run_url: Some("https://github.com/octo/site/actions/runs/42".to_string()),
            workflow_name: Some("Deploy".to_string()),
            error_text: Some("===== build.txt =====\nerror TS2304: Cannot find name 'foo'".to_string()),
            logs_text: None,
        })
    }

    fn request() -> FixRequest {
        FixRequest {
            specification: "A landing page with a signup form.\n".to_string(),
            role: "Frontend".to_string(),
            round: 2,
            max_rounds: 5,
            diagnostic: failed_build(),
        }
    }

    #[test]
    fn test_prompt_includes_context() {
        let prompt = request().prompt();
        assert!(prompt.contains("Frontend engineer"));
        assert!(prompt.contains("fix round 2 of 5"));
        assert!(prompt.contains("A landing page with a signup form."));
        assert!(prompt.contains("- Conclusion: failure"));
        assert!(prompt.contains("- Workflow: Deploy"));
        assert!(prompt.contains("actions/runs/42"));
        assert!(prompt.contains("Cannot find name 'foo'"));
    }

    #[test]
    fn test_prompt_format_example_is_parseable() {
        let prompt = request().prompt();
        let ops = parse_operations(&prompt).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].path(), "relative/path");
        assert_eq!(ops[1].content(), None);
    }

    #[test]
    fn test_prompt_without_diagnostic_uses_conclusion() {
        let mut req = request();
        req.diagnostic = Arc::new(WorkflowResult::timeout(None, ""));
        let prompt = req.prompt();
        assert!(prompt.contains("```\ntimeout\n```"));
    }
}
