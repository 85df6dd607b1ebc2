//! Ticket analysis handler: fetch the ticket, run the text heuristics.

use serde_json::{json, Value};

use super::required_str;
use crate::analysis;
use crate::jira::error::JiraResult;
use crate::jira::IssueTracker;

pub async fn analyze_ticket(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let ticket_key = required_str(args, "ticket_key")?;

    let issue = tracker.get_issue(ticket_key, None, None).await?;

    let summary = issue
        .pointer("/fields/summary")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let description = issue
        .pointer("/fields/description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let issue_type = issue
        .pointer("/fields/issuetype/name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");

    let analysis = analysis::analyze(description, issue_type);

    Ok(json!({
        "ticket": {
            "key": issue.get("key"),
            "summary": summary,
        },
        "analysis": analysis,
    }))
}
