//! Ticket reading handlers: single ticket, highest priority, subtasks,
//! project statuses.

use serde_json::{json, Value};

use super::{opt_bool, opt_str, opt_str_list, required_str};
use crate::config::Settings;
use crate::jira::error::JiraResult;
use crate::jira::IssueTracker;
use crate::jql;
use crate::ticket::parse_ticket_detail;

pub async fn get_ticket(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let ticket_key = required_str(args, "ticket_key")?;
    let include_comments = opt_bool(args, "include_comments", true);

    let expand = if include_comments {
        Some("renderedFields")
    } else {
        None
    };
    let issue = tracker.get_issue(ticket_key, None, expand).await?;

    Ok(json!(parse_ticket_detail(&issue)))
}

pub async fn get_highest_priority_ticket(
    args: &Value,
    tracker: &dyn IssueTracker,
    settings: &Settings,
) -> JiraResult<Value> {
    let project = opt_str(args, "project").or(settings.default_project.as_deref());
    let exclude_statuses = opt_str_list(args, "exclude_status");

    let jql = jql::highest_priority(project, &exclude_statuses);
    let result = tracker.search_issues(&jql, None, 1).await?;

    match result
        .get("issues")
        .and_then(Value::as_array)
        .and_then(|issues| issues.first())
    {
        Some(issue) => Ok(json!(parse_ticket_detail(issue))),
        None => Ok(json!({ "error": "No tickets found" })),
    }
}

pub async fn get_subtasks(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let issue_key = required_str(args, "issue_key")?;

    let subtasks = tracker.get_subtasks(issue_key).await?;

    let formatted: Vec<Value> = subtasks
        .iter()
        .map(|subtask| {
            json!({
                "key": subtask.get("key"),
                "summary": subtask.pointer("/fields/summary"),
                "status": subtask.pointer("/fields/status/name"),
                "assignee": subtask
                    .pointer("/fields/assignee/displayName")
                    .cloned()
                    .unwrap_or(json!("Unassigned")),
                "priority": subtask.pointer("/fields/priority/name"),
                "created": subtask.pointer("/fields/created"),
                "updated": subtask.pointer("/fields/updated"),
            })
        })
        .collect();

    Ok(json!({
        "parent_key": issue_key,
        "subtasks": formatted,
        "total": formatted.len(),
    }))
}

pub async fn get_project_statuses(
    args: &Value,
    tracker: &dyn IssueTracker,
    settings: &Settings,
) -> JiraResult<Value> {
    let project_key = settings.resolve_project(opt_str(args, "project_key"))?;
    tracker.get_project_statuses(project_key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::error::JiraError;
    use crate::mcp::tools::testing::{test_settings, MockTracker};

    #[tokio::test]
    async fn get_ticket_projects_detail() {
        let tracker = MockTracker {
            issue: Some(json!({
                "key": "PROJ-5",
                "fields": {
                    "summary": "A ticket",
                    "status": {"name": "Done"},
                    "labels": ["one"],
                }
            })),
            ..Default::default()
        };

        let response = get_ticket(&json!({"ticket_key": "PROJ-5"}), &tracker)
            .await
            .unwrap();
        assert_eq!(response["key"], "PROJ-5");
        assert_eq!(response["status"], "Done");
        assert_eq!(response["labels"], json!(["one"]));
        assert_eq!(response["comments"], json!([]));
    }

    #[tokio::test]
    async fn highest_priority_empty_result_is_payload_not_error() {
        let tracker = MockTracker {
            search_result: Some(json!({"issues": [], "total": 0})),
            ..Default::default()
        };
        let settings = test_settings(Some("DEF"));

        let response = get_highest_priority_ticket(&json!({}), &tracker, &settings)
            .await
            .unwrap();
        assert_eq!(response["error"], "No tickets found");

        let jql = tracker.last_jql.lock().unwrap().clone().unwrap();
        assert!(jql.contains("project = \"DEF\""));
        assert!(jql.ends_with("ORDER BY priority DESC"));
    }

    #[tokio::test]
    async fn highest_priority_accepts_single_exclude_status() {
        let tracker = MockTracker {
            search_result: Some(json!({"issues": [], "total": 0})),
            ..Default::default()
        };
        let settings = test_settings(None);

        get_highest_priority_ticket(&json!({"exclude_status": "Done"}), &tracker, &settings)
            .await
            .unwrap();

        let jql = tracker.last_jql.lock().unwrap().clone().unwrap();
        assert!(jql.contains("status != \"Done\""));
    }

    #[tokio::test]
    async fn subtasks_default_unassigned() {
        let tracker = MockTracker {
            subtasks: Some(vec![json!({
                "key": "PROJ-6",
                "fields": {"summary": "child", "status": {"name": "To Do"}, "assignee": null}
            })]),
            ..Default::default()
        };

        let response = get_subtasks(&json!({"issue_key": "PROJ-5"}), &tracker)
            .await
            .unwrap();
        assert_eq!(response["parent_key"], "PROJ-5");
        assert_eq!(response["total"], 1);
        assert_eq!(response["subtasks"][0]["assignee"], "Unassigned");
    }

    #[tokio::test]
    async fn project_statuses_require_some_project() {
        let tracker = MockTracker::default();
        let settings = test_settings(None);

        let err = get_project_statuses(&json!({}), &tracker, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, JiraError::Configuration(_)));
    }
}
