//! Projections of raw issue JSON into the flat shapes tool responses carry.
//!
//! Pure functions; reconstructed on every fetch, nothing is cached.

use serde::Serialize;
use serde_json::Value;

/// Compact ticket listing entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TicketSummary {
    pub key: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// One comment on a ticket.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TicketComment {
    pub author: Option<String>,
    pub body: Option<String>,
    pub created: Option<String>,
}

/// Full ticket view: summary fields plus description, people and comments.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TicketDetail {
    pub key: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub labels: Vec<String>,
    pub components: Vec<String>,
    pub comments: Vec<TicketComment>,
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

pub fn parse_ticket_summary(issue: &Value) -> TicketSummary {
    TicketSummary {
        key: issue.get("key").and_then(Value::as_str).map(str::to_string),
        summary: str_at(issue, "/fields/summary"),
        status: str_at(issue, "/fields/status/name"),
        priority: str_at(issue, "/fields/priority/name"),
        assignee: str_at(issue, "/fields/assignee/displayName"),
        created: str_at(issue, "/fields/created"),
        updated: str_at(issue, "/fields/updated"),
    }
}

pub fn parse_ticket_detail(issue: &Value) -> TicketDetail {
    let comments = issue
        .pointer("/fields/comment/comments")
        .and_then(Value::as_array)
        .map(|comments| {
            comments
                .iter()
                .map(|c| TicketComment {
                    author: str_at(c, "/author/displayName"),
                    body: c.get("body").and_then(Value::as_str).map(str::to_string),
                    created: c.get("created").and_then(Value::as_str).map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();

    let labels = issue
        .pointer("/fields/labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let components = issue
        .pointer("/fields/components")
        .and_then(Value::as_array)
        .map(|components| {
            components
                .iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    TicketDetail {
        key: issue.get("key").and_then(Value::as_str).map(str::to_string),
        summary: str_at(issue, "/fields/summary"),
        description: str_at(issue, "/fields/description"),
        status: str_at(issue, "/fields/status/name"),
        priority: str_at(issue, "/fields/priority/name"),
        assignee: str_at(issue, "/fields/assignee/displayName"),
        reporter: str_at(issue, "/fields/reporter/displayName"),
        created: str_at(issue, "/fields/created"),
        updated: str_at(issue, "/fields/updated"),
        labels,
        components,
        comments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_issue() -> Value {
        json!({
            "key": "PROJ-42",
            "fields": {
                "summary": "Fix login redirect",
                "description": "Users land on a 404 after login.",
                "status": {"name": "In Progress"},
                "priority": {"name": "High"},
                "assignee": {"displayName": "Dana Developer"},
                "reporter": {"displayName": "Riley Reporter"},
                "created": "2024-03-01T10:00:00.000+0000",
                "updated": "2024-03-02T09:30:00.000+0000",
                "labels": ["auth", "regression"],
                "components": [{"name": "web"}, {"name": "backend"}],
                "comment": {
                    "comments": [
                        {
                            "author": {"displayName": "Riley Reporter"},
                            "body": "Still reproducible.",
                            "created": "2024-03-02T08:00:00.000+0000"
                        }
                    ]
                }
            }
        })
    }

    #[test]
    fn summary_projects_nested_names() {
        let summary = parse_ticket_summary(&sample_issue());
        assert_eq!(summary.key.as_deref(), Some("PROJ-42"));
        assert_eq!(summary.status.as_deref(), Some("In Progress"));
        assert_eq!(summary.priority.as_deref(), Some("High"));
        assert_eq!(summary.assignee.as_deref(), Some("Dana Developer"));
    }

    #[test]
    fn summary_tolerates_unassigned_and_missing_fields() {
        let issue = json!({"key": "PROJ-7", "fields": {"summary": "Orphan", "assignee": null}});
        let summary = parse_ticket_summary(&issue);
        assert_eq!(summary.key.as_deref(), Some("PROJ-7"));
        assert_eq!(summary.assignee, None);
        assert_eq!(summary.status, None);
    }

    #[test]
    fn detail_collects_labels_components_comments() {
        let detail = parse_ticket_detail(&sample_issue());
        assert_eq!(detail.labels, vec!["auth", "regression"]);
        assert_eq!(detail.components, vec!["web", "backend"]);
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].author.as_deref(), Some("Riley Reporter"));
        assert_eq!(detail.comments[0].body.as_deref(), Some("Still reproducible."));
    }

    #[test]
    fn projections_are_idempotent() {
        let issue = sample_issue();
        assert_eq!(parse_ticket_summary(&issue), parse_ticket_summary(&issue));
        assert_eq!(parse_ticket_detail(&issue), parse_ticket_detail(&issue));
    }
}
