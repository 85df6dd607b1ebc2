//! Issue creation handlers.

use serde_json::{json, Value};

use super::{opt_str, opt_str_list, required_str};
use crate::config::Settings;
use crate::jira::error::JiraResult;
use crate::jira::{IssueTracker, NewIssue};

pub async fn create_issue(
    args: &Value,
    tracker: &dyn IssueTracker,
    settings: &Settings,
) -> JiraResult<Value> {
    let project_key = settings
        .resolve_project(opt_str(args, "project_key"))?
        .to_string();
    let summary = required_str(args, "summary")?;
    let description = required_str(args, "description")?;
    let issue_type = opt_str(args, "issue_type").unwrap_or("Task");
    let parent_key = opt_str(args, "parent_key").map(str::to_string);

    let result = tracker
        .create_issue(NewIssue {
            project_key: project_key.clone(),
            summary: summary.to_string(),
            description: description.to_string(),
            issue_type: issue_type.to_string(),
            priority: opt_str(args, "priority").map(str::to_string),
            assignee: opt_str(args, "assignee").map(str::to_string),
            labels: opt_str_list(args, "labels"),
            parent_key: parent_key.clone(),
        })
        .await?;

    Ok(json!({
        "success": true,
        "issue_key": result.get("key"),
        "issue_id": result.get("id"),
        "self": result.get("self"),
        "details": {
            "project": project_key,
            "type": issue_type,
            "summary": summary,
            "parent": parent_key,
        },
    }))
}

pub async fn create_subtask(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let parent_key = required_str(args, "parent_key")?;
    let summary = required_str(args, "summary")?;
    let description = required_str(args, "description")?;

    let result = tracker
        .create_subtask(
            parent_key,
            summary,
            description,
            opt_str(args, "assignee"),
            opt_str(args, "priority"),
        )
        .await?;

    Ok(json!({
        "success": true,
        "subtask_key": result.get("key"),
        "subtask_id": result.get("id"),
        "self": result.get("self"),
        "details": {
            "parent": parent_key,
            "summary": summary,
            "type": "Subtask",
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::error::JiraError;
    use crate::mcp::tools::testing::{test_settings, MockTracker};

    fn created() -> Value {
        json!({
            "key": "PROJ-10",
            "id": "10010",
            "self": "https://example.atlassian.net/rest/api/2/issue/10010"
        })
    }

    #[tokio::test]
    async fn create_issue_defaults_type_and_project() {
        let tracker = MockTracker {
            create_result: Some(created()),
            ..Default::default()
        };
        let settings = test_settings(Some("DEF"));

        let response = create_issue(
            &json!({"summary": "Add audit log", "description": "Track admin actions"}),
            &tracker,
            &settings,
        )
        .await
        .unwrap();

        assert_eq!(response["success"], true);
        assert_eq!(response["issue_key"], "PROJ-10");
        assert_eq!(response["details"]["type"], "Task");
        assert_eq!(response["details"]["project"], "DEF");

        let issue = tracker.last_new_issue.lock().unwrap().take().unwrap();
        assert_eq!(issue.project_key, "DEF");
        assert_eq!(issue.issue_type, "Task");
        assert!(issue.labels.is_empty());
    }

    #[tokio::test]
    async fn create_issue_without_project_fails_fast() {
        let tracker = MockTracker::default();
        let settings = test_settings(None);

        let err = create_issue(
            &json!({"summary": "s", "description": "d"}),
            &tracker,
            &settings,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, JiraError::Configuration(_)));
    }

    #[tokio::test]
    async fn create_subtask_reports_parent() {
        let tracker = MockTracker {
            create_result: Some(created()),
            ..Default::default()
        };

        let response = create_subtask(
            &json!({"parent_key": "PROJ-5", "summary": "schema", "description": "tables"}),
            &tracker,
        )
        .await
        .unwrap();

        assert_eq!(response["success"], true);
        assert_eq!(response["subtask_key"], "PROJ-10");
        assert_eq!(response["details"]["parent"], "PROJ-5");

        let issue = tracker.last_new_issue.lock().unwrap().take().unwrap();
        assert_eq!(issue.parent_key.as_deref(), Some("PROJ-5"));
    }
}
