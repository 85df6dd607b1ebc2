//! Ticket mutation handlers: status transitions, description edits,
//! comments, assignment, deletion.

use serde_json::{json, Value};
use tracing::warn;

use super::{opt_bool, opt_str, required_str};
use crate::jira::error::{JiraError, JiraResult};
use crate::jira::IssueTracker;

/// Soft ceiling before warning; Jira may truncate or reject beyond it.
const DESCRIPTION_WARN_LEN: usize = 30_000;

/// Case-insensitively match a target status name against the transitions'
/// target statuses. No match enumerates the reachable status names.
pub fn match_transition(transitions: &[Value], target_status: &str) -> JiraResult<String> {
    for transition in transitions {
        let to_name = transition
            .pointer("/to/name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if to_name.eq_ignore_ascii_case(target_status) {
            if let Some(id) = transition.get("id").and_then(Value::as_str) {
                return Ok(id.to_string());
            }
        }
    }

    let available = transitions
        .iter()
        .filter_map(|t| t.pointer("/to/name").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    Err(JiraError::InvalidTransition {
        target: target_status.to_string(),
        available,
    })
}

pub async fn update_ticket_status(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let ticket_key = required_str(args, "ticket_key")?;
    let target_status = required_str(args, "status")?;

    // Current status is only needed for reporting the before-state.
    let issue = tracker.get_issue(ticket_key, Some(&["status"]), None).await?;
    let old_status = issue
        .pointer("/fields/status/name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let transitions_result = tracker.get_transitions(ticket_key).await?;
    let transitions = transitions_result
        .get("transitions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let transition_id = match_transition(&transitions, target_status)?;

    tracker
        .transition_issue(ticket_key, &transition_id, opt_str(args, "comment"))
        .await?;

    // new_status reports the requested name; no confirming re-fetch.
    Ok(json!({
        "success": true,
        "ticket_key": ticket_key,
        "old_status": old_status,
        "new_status": target_status,
    }))
}

pub async fn update_ticket_description(
    args: &Value,
    tracker: &dyn IssueTracker,
) -> JiraResult<Value> {
    let ticket_key = required_str(args, "ticket_key")?;
    let new_description = required_str(args, "description")?;
    let append = opt_bool(args, "append", false);

    if new_description.len() > DESCRIPTION_WARN_LEN {
        warn!(
            ticket_key,
            len = new_description.len(),
            "description is very long, the API may truncate or reject it"
        );
    }

    let final_description = if append {
        let issue = tracker
            .get_issue(ticket_key, Some(&["description"]), None)
            .await?;
        let existing = issue
            .pointer("/fields/description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        format!("{existing}{new_description}")
    } else {
        new_description.to_string()
    };

    tracker
        .update_issue(ticket_key, json!({ "description": final_description }))
        .await?;

    Ok(json!({
        "success": true,
        "ticket_key": ticket_key,
    }))
}

pub async fn add_ticket_comment(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let ticket_key = required_str(args, "ticket_key")?;
    let comment = required_str(args, "comment")?;

    let result = tracker.add_comment(ticket_key, comment).await?;

    Ok(json!({
        "success": true,
        "ticket_key": ticket_key,
        "comment_id": result.get("id"),
    }))
}

pub async fn assign_issue(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let issue_key = required_str(args, "issue_key")?;
    let assignee = required_str(args, "assignee")?;

    tracker.assign_issue(issue_key, assignee).await?;

    let reported = if assignee == "-1" || assignee == "null" {
        "Unassigned/Automatic"
    } else {
        assignee
    };
    Ok(json!({
        "success": true,
        "issue_key": issue_key,
        "assignee": reported,
    }))
}

pub async fn delete_issue(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let issue_key = required_str(args, "issue_key")?;
    let delete_subtasks = opt_bool(args, "delete_subtasks", false);

    tracker.delete_issue(issue_key, delete_subtasks).await?;

    Ok(json!({
        "success": true,
        "deleted_issue": issue_key,
        "deleted_subtasks": delete_subtasks,
        "message": format!("Issue {issue_key} has been permanently deleted."),
    }))
}
