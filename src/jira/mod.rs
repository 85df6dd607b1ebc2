pub mod client;
pub mod error;

use async_trait::async_trait;
use serde_json::Value;

use self::error::JiraResult;

/// Specification for a new issue.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub project_key: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    /// Set for subtasks; the issue type must be a subtask type.
    pub parent_key: Option<String>,
}

/// Operations surface of the ticket tracker.
///
/// Tool handlers depend on this trait rather than the concrete HTTP client,
/// so tests can substitute canned responses. All methods return the raw API
/// JSON; projection into tool payloads happens at the tool layer.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// JQL search with transparent agile-board fallback on HTTP 410.
    async fn search_issues(
        &self,
        jql: &str,
        fields: Option<&[&str]>,
        max_results: u32,
    ) -> JiraResult<Value>;

    async fn get_issue(
        &self,
        key: &str,
        fields: Option<&[&str]>,
        expand: Option<&str>,
    ) -> JiraResult<Value>;

    /// PUT the given field map onto the issue. All-or-nothing.
    async fn update_issue(&self, key: &str, fields: Value) -> JiraResult<Value>;

    async fn get_transitions(&self, key: &str) -> JiraResult<Value>;

    /// Apply a transition, optionally attaching a comment in the same call.
    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        comment: Option<&str>,
    ) -> JiraResult<Value>;

    async fn add_comment(&self, key: &str, body: &str) -> JiraResult<Value>;

    async fn create_issue(&self, issue: NewIssue) -> JiraResult<Value>;

    /// Create a subtask under `parent_key`, inheriting the parent's project.
    async fn create_subtask(
        &self,
        parent_key: &str,
        summary: &str,
        description: &str,
        assignee: Option<&str>,
        priority: Option<&str>,
    ) -> JiraResult<Value>;

    /// Fetch the parent, then each listed subtask individually.
    async fn get_subtasks(&self, key: &str) -> JiraResult<Vec<Value>>;

    async fn link_issues(
        &self,
        inward_key: &str,
        outward_key: &str,
        link_type: &str,
    ) -> JiraResult<Value>;

    /// Assign an issue. `"-1"` requests automatic assignment and `"null"`
    /// unassigns; anything else is an account id (Cloud) or username.
    async fn assign_issue(&self, key: &str, assignee: &str) -> JiraResult<Value>;

    async fn search_users(&self, query: &str, max_results: u32) -> JiraResult<Value>;

    async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> JiraResult<Value>;

    /// Per-issue-type status breakdown plus a deduplicated union.
    async fn get_project_statuses(&self, project_key: &str) -> JiraResult<Value>;
}
