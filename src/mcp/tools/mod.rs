/// Tool catalog and dispatch for the Jira MCP server.
///
/// Each tool is a name, a description, and a JSON schema for its arguments;
/// handlers live in the sibling modules, grouped by concern. Dispatch
/// converts every handler failure into a success-shaped payload carrying
/// `{"success": false, "error": {...}}` so the transport never sees a fault
/// for an operational error.
pub mod analyze_ticket;
pub mod create_ticket;
pub mod get_ticket;
pub mod list_tickets;
pub mod update_ticket;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::Settings;
use crate::jira::error::{JiraError, JiraResult};
use crate::jira::IssueTracker;

/// Fields requested for listing searches; matches the summary projection.
pub(crate) const SUMMARY_FIELDS: [&str; 6] =
    ["summary", "status", "priority", "assignee", "created", "updated"];

/// Content block returned to the MCP host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

impl Content {
    /// Wrap a JSON payload as a pretty-printed text block.
    pub fn json(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!(r#"{{"serialization_error": "{e}"}}"#));
        Content::Text { text }
    }
}

/// Tool catalog entry as published by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolInfo {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// The published tool catalog.
pub fn catalog() -> Vec<ToolInfo> {
    vec![
        ToolInfo::new(
            "list_my_tickets",
            "List all tickets assigned to the current user",
            json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "description": "Filter by status (e.g., 'In Progress', 'To Do')"
                    },
                    "project": {
                        "type": "string",
                        "description": "Filter by project key"
                    },
                    "max_results": {
                        "type": "number",
                        "description": "Maximum number of results",
                        "default": 50
                    }
                }
            }),
        ),
        ToolInfo::new(
            "list_tickets_by_creator",
            "List tickets created by a specific user",
            json!({
                "type": "object",
                "properties": {
                    "creator": {
                        "type": "string",
                        "description": "Creator email, username, or 'currentUser()' for yourself"
                    },
                    "project": {
                        "type": "string",
                        "description": "Filter by project key (optional, uses default if not specified)"
                    },
                    "status": {
                        "type": "string",
                        "description": "Filter by status (optional)"
                    },
                    "max_results": {
                        "type": "number",
                        "description": "Maximum number of results (default: 50)",
                        "default": 50
                    }
                },
                "required": ["creator"]
            }),
        ),
        ToolInfo::new(
            "get_ticket",
            "Get detailed information about a specific ticket",
            json!({
                "type": "object",
                "properties": {
                    "ticket_key": {
                        "type": "string",
                        "description": "Jira ticket key (e.g., 'PROJ-123')"
                    },
                    "include_comments": {
                        "type": "boolean",
                        "description": "Include comments in response",
                        "default": true
                    }
                },
                "required": ["ticket_key"]
            }),
        ),
        ToolInfo::new(
            "get_highest_priority_ticket",
            "Get the highest priority ticket assigned to the current user. \
             Defaults to configured project if set.",
            json!({
                "type": "object",
                "properties": {
                    "exclude_status": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Statuses to exclude"
                    },
                    "project": {
                        "type": "string",
                        "description": "Filter by project key (optional, uses default project from config if not specified)"
                    }
                }
            }),
        ),
        ToolInfo::new(
            "get_subtasks",
            "Get all subtasks of a parent issue",
            json!({
                "type": "object",
                "properties": {
                    "issue_key": {
                        "type": "string",
                        "description": "Parent issue key (e.g., 'PROJ-501')"
                    }
                },
                "required": ["issue_key"]
            }),
        ),
        ToolInfo::new(
            "list_users",
            "List and search for Jira users. Search by name, email prefix, or \
             partial match. Leave query empty to list all users.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (name, email, or username). Leave empty to list all users."
                    },
                    "max_results": {
                        "type": "number",
                        "description": "Maximum number of results (default: 50)",
                        "default": 50
                    }
                }
            }),
        ),
        ToolInfo::new(
            "get_project_statuses",
            "Get all available statuses for a project, broken down by issue type",
            json!({
                "type": "object",
                "properties": {
                    "project_key": {
                        "type": "string",
                        "description": "Project key (e.g., 'PROJ'). Optional if default project is configured."
                    }
                }
            }),
        ),
        ToolInfo::new(
            "analyze_ticket",
            "Analyze ticket and extract structured implementation details",
            json!({
                "type": "object",
                "properties": {
                    "ticket_key": {
                        "type": "string",
                        "description": "Jira ticket key"
                    }
                },
                "required": ["ticket_key"]
            }),
        ),
        ToolInfo::new(
            "create_issue",
            "Create a new Jira issue (Story, Task, Bug, etc.). If project_key \
             is not specified, uses the default project from configuration.",
            json!({
                "type": "object",
                "properties": {
                    "project_key": {
                        "type": "string",
                        "description": "Project key (e.g., 'PROJ'). Optional if default project is configured."
                    },
                    "summary": {
                        "type": "string",
                        "description": "Issue title/summary"
                    },
                    "description": {
                        "type": "string",
                        "description": "Detailed description of the issue"
                    },
                    "issue_type": {
                        "type": "string",
                        "description": "Type of issue: Task, Story, Bug, Epic (default: Task)",
                        "default": "Task"
                    },
                    "priority": {
                        "type": "string",
                        "description": "Priority: Highest, High, Medium, Low, Lowest (optional)"
                    },
                    "assignee": {
                        "type": "string",
                        "description": "Account ID or email of assignee (optional)"
                    },
                    "labels": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of labels (optional)"
                    },
                    "parent_key": {
                        "type": "string",
                        "description": "Parent issue key for creating stories under epics (optional)"
                    }
                },
                "required": ["summary", "description"]
            }),
        ),
        ToolInfo::new(
            "create_subtask",
            "Create a subtask under a parent issue",
            json!({
                "type": "object",
                "properties": {
                    "parent_key": {
                        "type": "string",
                        "description": "Parent issue key (e.g., 'PROJ-501')"
                    },
                    "summary": {
                        "type": "string",
                        "description": "Subtask title/summary"
                    },
                    "description": {
                        "type": "string",
                        "description": "Detailed description of the subtask"
                    },
                    "assignee": {
                        "type": "string",
                        "description": "Account ID or email of assignee (optional)"
                    },
                    "priority": {
                        "type": "string",
                        "description": "Priority: Highest, High, Medium, Low, Lowest (optional)"
                    }
                },
                "required": ["parent_key", "summary", "description"]
            }),
        ),
        ToolInfo::new(
            "update_ticket_status",
            "Transition ticket to a new status",
            json!({
                "type": "object",
                "properties": {
                    "ticket_key": {
                        "type": "string",
                        "description": "Jira ticket key"
                    },
                    "status": {
                        "type": "string",
                        "description": "Target status name"
                    },
                    "comment": {
                        "type": "string",
                        "description": "Optional comment to add"
                    }
                },
                "required": ["ticket_key", "status"]
            }),
        ),
        ToolInfo::new(
            "update_ticket_description",
            "Update ticket description",
            json!({
                "type": "object",
                "properties": {
                    "ticket_key": {
                        "type": "string",
                        "description": "Jira ticket key"
                    },
                    "description": {
                        "type": "string",
                        "description": "New description text"
                    },
                    "append": {
                        "type": "boolean",
                        "description": "Append to existing description instead of replacing",
                        "default": false
                    }
                },
                "required": ["ticket_key", "description"]
            }),
        ),
        ToolInfo::new(
            "add_ticket_comment",
            "Add a comment to a ticket",
            json!({
                "type": "object",
                "properties": {
                    "ticket_key": {
                        "type": "string",
                        "description": "Jira ticket key"
                    },
                    "comment": {
                        "type": "string",
                        "description": "Comment text"
                    }
                },
                "required": ["ticket_key", "comment"]
            }),
        ),
        ToolInfo::new(
            "assign_issue",
            "Assign an issue to a user",
            json!({
                "type": "object",
                "properties": {
                    "issue_key": {
                        "type": "string",
                        "description": "Issue key (e.g., 'PROJ-501')"
                    },
                    "assignee": {
                        "type": "string",
                        "description": "Account ID or email of assignee. Use '-1' for automatic, 'null' for unassigned"
                    }
                },
                "required": ["issue_key", "assignee"]
            }),
        ),
        ToolInfo::new(
            "delete_issue",
            "Delete a Jira issue permanently. This action cannot be undone.",
            json!({
                "type": "object",
                "properties": {
                    "issue_key": {
                        "type": "string",
                        "description": "Issue key to delete (e.g., 'PROJ-123')"
                    },
                    "delete_subtasks": {
                        "type": "boolean",
                        "description": "Whether to delete subtasks as well (default: false)",
                        "default": false
                    }
                },
                "required": ["issue_key"]
            }),
        ),
    ]
}

/// Execute a named tool against the tracker and settings.
///
/// Always returns content blocks; operational failures become a
/// `{"success": false, "error": {...}}` payload. Error messages never carry
/// credential material (the error taxonomy guarantees this).
pub async fn dispatch(
    name: &str,
    arguments: &Value,
    tracker: &dyn IssueTracker,
    settings: &Settings,
) -> Vec<Content> {
    info!(tool = name, "dispatching tool call");

    let result = match name {
        "list_my_tickets" => list_tickets::list_my_tickets(arguments, tracker).await,
        "list_tickets_by_creator" => {
            list_tickets::list_tickets_by_creator(arguments, tracker, settings).await
        }
        "list_users" => list_tickets::list_users(arguments, tracker).await,
        "get_ticket" => get_ticket::get_ticket(arguments, tracker).await,
        "get_highest_priority_ticket" => {
            get_ticket::get_highest_priority_ticket(arguments, tracker, settings).await
        }
        "get_subtasks" => get_ticket::get_subtasks(arguments, tracker).await,
        "get_project_statuses" => {
            get_ticket::get_project_statuses(arguments, tracker, settings).await
        }
        "analyze_ticket" => analyze_ticket::analyze_ticket(arguments, tracker).await,
        "create_issue" => create_ticket::create_issue(arguments, tracker, settings).await,
        "create_subtask" => create_ticket::create_subtask(arguments, tracker).await,
        "update_ticket_status" => update_ticket::update_ticket_status(arguments, tracker).await,
        "update_ticket_description" => {
            update_ticket::update_ticket_description(arguments, tracker).await
        }
        "add_ticket_comment" => update_ticket::add_ticket_comment(arguments, tracker).await,
        "assign_issue" => update_ticket::assign_issue(arguments, tracker).await,
        "delete_issue" => update_ticket::delete_issue(arguments, tracker).await,
        _ => Err(JiraError::ValidationFailed {
            details: Some(json!(format!("Unknown tool: {name}"))),
        }),
    };

    match result {
        Ok(payload) => vec![Content::json(&payload)],
        Err(e) => {
            warn!(tool = name, error = %e, "tool call failed");
            vec![Content::json(&json!({
                "success": false,
                "error": {
                    "message": e.to_string(),
                    "tool": name,
                }
            }))]
        }
    }
}

// Argument accessors shared by the handlers. Missing or mistyped required
// arguments surface as validation failures, not panics.

pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> JiraResult<&'a str> {
    args.get(name).and_then(Value::as_str).ok_or_else(|| {
        JiraError::ValidationFailed {
            details: Some(json!(format!("missing required argument: {name}"))),
        }
    })
}

pub(crate) fn opt_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

pub(crate) fn opt_u32(args: &Value, name: &str, default: u32) -> u32 {
    args.get(name)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(default)
}

pub(crate) fn opt_bool(args: &Value, name: &str, default: bool) -> bool {
    args.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// A string-list argument; a lone string is accepted as a one-element list,
/// anything else is ignored.
pub(crate) fn opt_str_list(args: &Value, name: &str) -> Vec<String> {
    match args.get(name) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::config::{AuthPair, Settings};
    use crate::jira::error::{JiraError, JiraResult};
    use crate::jira::{IssueTracker, NewIssue};

    pub fn test_settings(default_project: Option<&str>) -> Settings {
        Settings {
            jira_url: "https://example.atlassian.net".to_string(),
            auth: AuthPair::Cloud {
                email: "dev@example.com".to_string(),
                token: "tok".to_string(),
            },
            default_project: default_project.map(str::to_string),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    /// Canned-response tracker for handler tests. Unstubbed calls fail.
    #[derive(Default)]
    pub struct MockTracker {
        pub search_result: Option<Value>,
        pub issue: Option<Value>,
        pub transitions: Option<Value>,
        pub create_result: Option<Value>,
        pub comment_result: Option<Value>,
        pub users: Option<Value>,
        pub subtasks: Option<Vec<Value>>,
        pub project_statuses: Option<Value>,
        pub generic_ok: Option<Value>,
        pub last_jql: Mutex<Option<String>>,
        pub last_update_fields: Mutex<Option<Value>>,
        pub last_transition: Mutex<Option<(String, Option<String>)>>,
        pub last_new_issue: Mutex<Option<NewIssue>>,
        pub last_assignee: Mutex<Option<String>>,
    }

    fn stub<T: Clone>(value: &Option<T>, what: &str) -> JiraResult<T> {
        value
            .clone()
            .ok_or_else(|| JiraError::RequestFailed(format!("{what} not stubbed")))
    }

    #[async_trait]
    impl IssueTracker for MockTracker {
        async fn search_issues(
            &self,
            jql: &str,
            _fields: Option<&[&str]>,
            _max_results: u32,
        ) -> JiraResult<Value> {
            *self.last_jql.lock().unwrap() = Some(jql.to_string());
            stub(&self.search_result, "search_issues")
        }

        async fn get_issue(
            &self,
            _key: &str,
            _fields: Option<&[&str]>,
            _expand: Option<&str>,
        ) -> JiraResult<Value> {
            stub(&self.issue, "get_issue")
        }

        async fn update_issue(&self, _key: &str, fields: Value) -> JiraResult<Value> {
            *self.last_update_fields.lock().unwrap() = Some(fields);
            stub(&self.generic_ok, "update_issue")
        }

        async fn get_transitions(&self, _key: &str) -> JiraResult<Value> {
            stub(&self.transitions, "get_transitions")
        }

        async fn transition_issue(
            &self,
            _key: &str,
            transition_id: &str,
            comment: Option<&str>,
        ) -> JiraResult<Value> {
            *self.last_transition.lock().unwrap() =
                Some((transition_id.to_string(), comment.map(str::to_string)));
            stub(&self.generic_ok, "transition_issue")
        }

        async fn add_comment(&self, _key: &str, _body: &str) -> JiraResult<Value> {
            stub(&self.comment_result, "add_comment")
        }

        async fn create_issue(&self, issue: NewIssue) -> JiraResult<Value> {
            *self.last_new_issue.lock().unwrap() = Some(issue);
            stub(&self.create_result, "create_issue")
        }

        async fn create_subtask(
            &self,
            parent_key: &str,
            summary: &str,
            description: &str,
            assignee: Option<&str>,
            priority: Option<&str>,
        ) -> JiraResult<Value> {
            *self.last_new_issue.lock().unwrap() = Some(NewIssue {
                project_key: String::new(),
                summary: summary.to_string(),
                description: description.to_string(),
                issue_type: "Subtask".to_string(),
                priority: priority.map(str::to_string),
                assignee: assignee.map(str::to_string),
                labels: Vec::new(),
                parent_key: Some(parent_key.to_string()),
            });
            stub(&self.create_result, "create_subtask")
        }

        async fn get_subtasks(&self, _key: &str) -> JiraResult<Vec<Value>> {
            stub(&self.subtasks, "get_subtasks")
        }

        async fn link_issues(
            &self,
            _inward_key: &str,
            _outward_key: &str,
            _link_type: &str,
        ) -> JiraResult<Value> {
            stub(&self.generic_ok, "link_issues")
        }

        async fn assign_issue(&self, _key: &str, assignee: &str) -> JiraResult<Value> {
            *self.last_assignee.lock().unwrap() = Some(assignee.to_string());
            stub(&self.generic_ok, "assign_issue")
        }

        async fn search_users(&self, _query: &str, _max_results: u32) -> JiraResult<Value> {
            stub(&self.users, "search_users")
        }

        async fn delete_issue(&self, _key: &str, _delete_subtasks: bool) -> JiraResult<Value> {
            stub(&self.generic_ok, "delete_issue")
        }

        async fn get_project_statuses(&self, _project_key: &str) -> JiraResult<Value> {
            stub(&self.project_statuses, "get_project_statuses")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{test_settings, MockTracker};
    use super::*;

    #[test]
    fn catalog_publishes_fifteen_tools() {
        let tools = catalog();
        assert_eq!(tools.len(), 15);

        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        for expected in [
            "list_my_tickets",
            "list_tickets_by_creator",
            "get_ticket",
            "get_highest_priority_ticket",
            "get_subtasks",
            "list_users",
            "get_project_statuses",
            "analyze_ticket",
            "create_issue",
            "create_subtask",
            "update_ticket_status",
            "update_ticket_description",
            "add_ticket_comment",
            "assign_issue",
            "delete_issue",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
    }

    #[test]
    fn catalog_schemas_use_input_schema_key() {
        let tools = catalog();
        let serialized = serde_json::to_value(&tools[0]).unwrap();
        assert!(serialized.get("inputSchema").is_some());
        assert!(serialized.get("input_schema").is_none());
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_degrades_to_failure_payload() {
        let tracker = MockTracker::default();
        let settings = test_settings(None);

        let content = dispatch("frobnicate", &json!({}), &tracker, &settings).await;
        assert_eq!(content.len(), 1);

        let Content::Text { text } = &content[0];
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"]["tool"], "frobnicate");
    }

    #[tokio::test]
    async fn dispatch_handler_error_carries_tool_name() {
        // get_ticket with an unstubbed tracker fails inside the handler.
        let tracker = MockTracker::default();
        let settings = test_settings(None);

        let content = dispatch(
            "get_ticket",
            &json!({"ticket_key": "PROJ-1"}),
            &tracker,
            &settings,
        )
        .await;

        let Content::Text { text } = &content[0];
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"]["tool"], "get_ticket");
    }

    #[test]
    fn opt_u32_rejects_out_of_range_values() {
        let args = json!({
            "ok": 25,
            "huge": u64::from(u32::MAX) + 1,
            "negative": -5,
            "wrong_type": "10",
        });
        assert_eq!(opt_u32(&args, "ok", 50), 25);
        assert_eq!(opt_u32(&args, "huge", 50), 50);
        assert_eq!(opt_u32(&args, "negative", 50), 50);
        assert_eq!(opt_u32(&args, "wrong_type", 50), 50);
        assert_eq!(opt_u32(&args, "absent", 50), 50);
    }

    #[test]
    fn opt_str_list_accepts_string_or_array() {
        let args = json!({"single": "Done", "many": ["Done", "Closed"], "bad": 7});
        assert_eq!(opt_str_list(&args, "single"), vec!["Done"]);
        assert_eq!(opt_str_list(&args, "many"), vec!["Done", "Closed"]);
        assert!(opt_str_list(&args, "bad").is_empty());
        assert!(opt_str_list(&args, "absent").is_empty());
    }
}
