//! Ticket and user listing handlers.

use serde_json::{json, Value};

use super::{opt_str, opt_u32, SUMMARY_FIELDS};
use crate::config::Settings;
use crate::jira::error::JiraResult;
use crate::jira::IssueTracker;
use crate::jql;
use crate::ticket::parse_ticket_summary;

pub async fn list_my_tickets(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let jql = jql::my_tickets(opt_str(args, "status"), opt_str(args, "project"), &[]);
    let max_results = opt_u32(args, "max_results", 50);

    let result = tracker
        .search_issues(&jql, Some(&SUMMARY_FIELDS), max_results)
        .await?;

    let tickets: Vec<Value> = result
        .get("issues")
        .and_then(Value::as_array)
        .map(|issues| {
            issues
                .iter()
                .map(|issue| json!(parse_ticket_summary(issue)))
                .collect()
        })
        .unwrap_or_default();

    Ok(json!({
        "tickets": tickets,
        "total": result.get("total").cloned().unwrap_or(json!(0)),
    }))
}

pub async fn list_tickets_by_creator(
    args: &Value,
    tracker: &dyn IssueTracker,
    settings: &Settings,
) -> JiraResult<Value> {
    let creator = super::required_str(args, "creator")?;
    let project = opt_str(args, "project").or(settings.default_project.as_deref());
    let jql = jql::by_creator(creator, project, opt_str(args, "status"));
    let max_results = opt_u32(args, "max_results", 50);

    let result = tracker
        .search_issues(&jql, Some(&SUMMARY_FIELDS), max_results)
        .await?;

    let tickets: Vec<Value> = result
        .get("issues")
        .and_then(Value::as_array)
        .map(|issues| {
            issues
                .iter()
                .map(|issue| json!(parse_ticket_summary(issue)))
                .collect()
        })
        .unwrap_or_default();

    Ok(json!({
        "creator": creator,
        "tickets": tickets,
        "total": result.get("total").cloned().unwrap_or(json!(0)),
    }))
}

pub async fn list_users(args: &Value, tracker: &dyn IssueTracker) -> JiraResult<Value> {
    let query = opt_str(args, "query").unwrap_or("");
    let max_results = opt_u32(args, "max_results", 50);

    let users = tracker.search_users(query, max_results).await?;

    let formatted: Vec<Value> = users
        .as_array()
        .map(|users| {
            users
                .iter()
                .map(|user| {
                    json!({
                        "accountId": user.get("accountId"),
                        "displayName": user.get("displayName"),
                        "emailAddress": user.get("emailAddress"),
                        "active": user.get("active").cloned().unwrap_or(json!(true)),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(json!({
        "users": formatted,
        "total": formatted.len(),
    }))
}
