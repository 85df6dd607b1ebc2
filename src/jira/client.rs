use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::error::{JiraError, JiraResult};
use super::{IssueTracker, NewIssue};
use crate::config::Settings;

const API_PREFIX: &str = "/rest/api/2";
const AGILE_PREFIX: &str = "/rest/agile/1.0";

/// Most boards fetched when the search endpoint is gone.
const BOARD_LIST_CAP: u32 = 50;
/// Most boards actually queried during fallback aggregation.
const BOARD_SEARCH_CAP: usize = 10;

/// Backoff before retry attempt `retry`: 1s, 2s, 4s, ...
pub fn backoff_delay(retry: u32) -> Duration {
    Duration::from_secs(1u64 << retry)
}

/// Merge one board's issues into the accumulator, deduplicating by issue key.
/// First occurrence wins; stops once `limit` issues are accumulated.
pub fn merge_board_issues(
    acc: &mut Vec<Value>,
    seen: &mut HashSet<String>,
    issues: &[Value],
    limit: usize,
) {
    for issue in issues {
        if acc.len() >= limit {
            return;
        }
        let Some(key) = issue.get("key").and_then(Value::as_str) else {
            continue;
        };
        if seen.insert(key.to_string()) {
            acc.push(issue.clone());
        }
    }
}

/// Assignee field for the issue payload. Cloud addresses users by account
/// id, Server by username. `"null"` clears the assignee; `"-1"` passes
/// through and requests the project default.
pub fn assignee_field(is_cloud: bool, assignee: &str) -> Value {
    let value = if assignee == "null" {
        Value::Null
    } else {
        Value::String(assignee.to_string())
    };
    if is_cloud {
        json!({ "accountId": value })
    } else {
        json!({ "name": value })
    }
}

/// Collapse the raw per-issue-type status listing into a per-type breakdown
/// plus a deduplicated, sorted union of every status name in the project.
pub fn summarize_project_statuses(project_key: &str, raw: &Value) -> Value {
    let mut by_type = serde_json::Map::new();
    let mut union: BTreeSet<String> = BTreeSet::new();

    if let Some(issue_types) = raw.as_array() {
        for issue_type in issue_types {
            let Some(type_name) = issue_type.get("name").and_then(Value::as_str) else {
                continue;
            };
            let names: Vec<String> = issue_type
                .get("statuses")
                .and_then(Value::as_array)
                .map(|statuses| {
                    statuses
                        .iter()
                        .filter_map(|s| s.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            union.extend(names.iter().cloned());
            by_type.insert(type_name.to_string(), json!(names));
        }
    }

    json!({
        "project": project_key,
        "statuses_by_type": by_type,
        "all_statuses": union.into_iter().collect::<Vec<_>>(),
    })
}

/// Async Jira REST client with bounded retry.
///
/// Transient failures (429, connect errors, timeouts) are retried with
/// exponential backoff up to `max_retries`; everything else propagates on
/// the first attempt. Searches transparently fall back to agile-board
/// aggregation when the standard search endpoint returns 410.
pub struct JiraClient {
    http: HttpClient,
    settings: Settings,
}

impl JiraClient {
    pub fn new(settings: Settings) -> JiraResult<Self> {
        let http = HttpClient::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| JiraError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, settings })
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> JiraResult<Value> {
        self.execute_at(API_PREFIX, method, path, params, body).await
    }

    /// Perform one authenticated call with the bounded retry loop.
    ///
    /// Attempts never exceed `max_retries + 1`. 401/404/400 map to their
    /// error kinds on the first response; 429 and connect/timeout failures
    /// sleep `2^retry` seconds before the next attempt.
    async fn execute_at(
        &self,
        prefix: &str,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> JiraResult<Value> {
        let url = format!("{}{}{}", self.settings.jira_url, prefix, path);
        let mut retry: u32 = 0;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .basic_auth(self.settings.auth.principal(), Some(self.settings.auth.secret()))
                .header(reqwest::header::ACCEPT, "application/json");
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if (200..300).contains(&status) {
                        debug!(%method, path, status, "request succeeded");
                        let text = response
                            .text()
                            .await
                            .map_err(|e| JiraError::RequestFailed(e.to_string()))?;
                        if text.is_empty() {
                            return Ok(json!({}));
                        }
                        return serde_json::from_str(&text).map_err(|e| {
                            JiraError::RequestFailed(format!("invalid JSON in response: {e}"))
                        });
                    }

                    if status == 429 && retry < self.settings.max_retries {
                        let wait = backoff_delay(retry);
                        warn!(
                            path,
                            attempt = retry + 1,
                            max = self.settings.max_retries,
                            wait_secs = wait.as_secs(),
                            "rate limited, backing off"
                        );
                        tokio::time::sleep(wait).await;
                        retry += 1;
                        continue;
                    }

                    let details = Self::read_details(response).await;
                    error!(%method, path, status, "request failed");
                    return Err(match status {
                        401 => JiraError::AuthenticationFailed,
                        404 => JiraError::ResourceNotFound { details },
                        400 => JiraError::ValidationFailed { details },
                        429 => JiraError::RateLimitExceeded,
                        _ => JiraError::GenericApi { status, details },
                    });
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && retry < self.settings.max_retries => {
                    let wait = backoff_delay(retry);
                    warn!(
                        path,
                        attempt = retry + 1,
                        max = self.settings.max_retries,
                        wait_secs = wait.as_secs(),
                        error = %e,
                        "network error, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    retry += 1;
                }
                Err(e) => {
                    error!(path, error = %e, "request failed");
                    return Err(JiraError::RequestFailed(e.to_string()));
                }
            }
        }
    }

    /// Error-response body as JSON when it parses, raw text otherwise.
    async fn read_details(response: reqwest::Response) -> Option<Value> {
        let text = response.text().await.ok()?;
        if text.is_empty() {
            return None;
        }
        Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn composed_search_error() -> JiraError {
        JiraError::GenericApi {
            status: 410,
            details: Some(Value::String(
                "Unable to search issues. Both standard and agile APIs failed. \
                 Please check your Jira permissions."
                    .to_string(),
            )),
        }
    }

    /// Aggregate search results across agile boards when `/search` is gone.
    ///
    /// Lists up to 50 boards, queries the first 10, dedups across boards by
    /// issue key. A failing board is skipped; the whole fallback fails only
    /// when boards exist and every queried board failed.
    async fn search_via_boards(
        &self,
        jql: &str,
        fields: Option<&[&str]>,
        limit: usize,
    ) -> JiraResult<Value> {
        let boards_result = self
            .execute_at(
                AGILE_PREFIX,
                Method::GET,
                "/board",
                &[("maxResults".to_string(), BOARD_LIST_CAP.to_string())],
                None,
            )
            .await
            .map_err(|e| {
                error!(error = %e, "board listing failed during search fallback");
                Self::composed_search_error()
            })?;

        let boards = boards_result
            .get("values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        info!(boards = boards.len(), "aggregating search across boards");

        if boards.is_empty() {
            return Ok(json!({ "issues": [], "total": 0 }));
        }

        let mut all_issues = Vec::new();
        let mut seen_keys = HashSet::new();
        let mut failed = 0usize;
        let queried = boards.len().min(BOARD_SEARCH_CAP);

        for board in boards.iter().take(BOARD_SEARCH_CAP) {
            let Some(board_id) = board.get("id").and_then(Value::as_u64) else {
                failed += 1;
                continue;
            };

            let mut params = vec![
                ("jql".to_string(), jql.to_string()),
                ("maxResults".to_string(), limit.to_string()),
            ];
            if let Some(fields) = fields {
                params.push(("fields".to_string(), fields.join(",")));
            }

            match self
                .execute_at(
                    AGILE_PREFIX,
                    Method::GET,
                    &format!("/board/{board_id}/issue"),
                    &params,
                    None,
                )
                .await
            {
                Ok(result) => {
                    let issues = result
                        .get("issues")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    merge_board_issues(&mut all_issues, &mut seen_keys, &issues, limit);
                    if all_issues.len() >= limit {
                        break;
                    }
                }
                Err(e) => {
                    debug!(board_id, error = %e, "board search failed, skipping");
                    failed += 1;
                }
            }
        }

        if all_issues.is_empty() && failed == queried {
            return Err(Self::composed_search_error());
        }

        let total = all_issues.len();
        Ok(json!({ "issues": all_issues, "total": total }))
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn search_issues(
        &self,
        jql: &str,
        fields: Option<&[&str]>,
        max_results: u32,
    ) -> JiraResult<Value> {
        let mut params = vec![
            ("jql".to_string(), jql.to_string()),
            ("maxResults".to_string(), max_results.to_string()),
        ];
        if let Some(fields) = fields {
            params.push(("fields".to_string(), fields.join(",")));
        }

        info!(jql, "searching issues");
        match self.execute(Method::GET, "/search", &params, None).await {
            Err(JiraError::GenericApi { status: 410, .. }) => {
                warn!("standard search endpoint unavailable (410), using agile board fallback");
                self.search_via_boards(jql, fields, max_results as usize).await
            }
            other => other,
        }
    }

    async fn get_issue(
        &self,
        key: &str,
        fields: Option<&[&str]>,
        expand: Option<&str>,
    ) -> JiraResult<Value> {
        let mut params = Vec::new();
        if let Some(fields) = fields {
            params.push(("fields".to_string(), fields.join(",")));
        }
        if let Some(expand) = expand {
            params.push(("expand".to_string(), expand.to_string()));
        }

        info!(key, "fetching issue");
        self.execute(Method::GET, &format!("/issue/{key}"), &params, None)
            .await
    }

    async fn update_issue(&self, key: &str, fields: Value) -> JiraResult<Value> {
        info!(key, "updating issue");
        self.execute(
            Method::PUT,
            &format!("/issue/{key}"),
            &[],
            Some(&json!({ "fields": fields })),
        )
        .await
    }

    async fn get_transitions(&self, key: &str) -> JiraResult<Value> {
        self.execute(Method::GET, &format!("/issue/{key}/transitions"), &[], None)
            .await
    }

    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        comment: Option<&str>,
    ) -> JiraResult<Value> {
        let mut payload = json!({ "transition": { "id": transition_id } });
        if let Some(comment) = comment {
            payload["update"] = json!({ "comment": [{ "add": { "body": comment } }] });
        }

        info!(key, transition_id, "transitioning issue");
        self.execute(
            Method::POST,
            &format!("/issue/{key}/transitions"),
            &[],
            Some(&payload),
        )
        .await
    }

    async fn add_comment(&self, key: &str, body: &str) -> JiraResult<Value> {
        info!(key, "adding comment");
        self.execute(
            Method::POST,
            &format!("/issue/{key}/comment"),
            &[],
            Some(&json!({ "body": body })),
        )
        .await
    }

    async fn create_issue(&self, issue: NewIssue) -> JiraResult<Value> {
        info!(
            project = %issue.project_key,
            issue_type = %issue.issue_type,
            "creating issue"
        );

        let mut fields = serde_json::Map::new();
        fields.insert("project".to_string(), json!({ "key": issue.project_key }));
        fields.insert("summary".to_string(), json!(issue.summary));
        fields.insert("description".to_string(), json!(issue.description));
        fields.insert("issuetype".to_string(), json!({ "name": issue.issue_type }));
        if let Some(priority) = &issue.priority {
            fields.insert("priority".to_string(), json!({ "name": priority }));
        }
        if let Some(assignee) = &issue.assignee {
            fields.insert(
                "assignee".to_string(),
                assignee_field(self.settings.auth.is_cloud(), assignee),
            );
        }
        if !issue.labels.is_empty() {
            fields.insert("labels".to_string(), json!(issue.labels));
        }
        if let Some(parent) = &issue.parent_key {
            fields.insert("parent".to_string(), json!({ "key": parent }));
        }

        self.execute(
            Method::POST,
            "/issue",
            &[],
            Some(&json!({ "fields": Value::Object(fields) })),
        )
        .await
    }

    async fn create_subtask(
        &self,
        parent_key: &str,
        summary: &str,
        description: &str,
        assignee: Option<&str>,
        priority: Option<&str>,
    ) -> JiraResult<Value> {
        // The subtask must land in the parent's project.
        let parent = self.get_issue(parent_key, Some(&["project"]), None).await?;
        let project_key = parent
            .pointer("/fields/project/key")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                JiraError::RequestFailed(format!("parent issue {parent_key} has no project"))
            })?
            .to_string();

        self.create_issue(NewIssue {
            project_key,
            summary: summary.to_string(),
            description: description.to_string(),
            issue_type: "Subtask".to_string(),
            priority: priority.map(str::to_string),
            assignee: assignee.map(str::to_string),
            labels: Vec::new(),
            parent_key: Some(parent_key.to_string()),
        })
        .await
    }

    async fn get_subtasks(&self, key: &str) -> JiraResult<Vec<Value>> {
        let parent = self.get_issue(key, Some(&["subtasks"]), None).await?;
        let stubs = parent
            .pointer("/fields/subtasks")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // Subtask stubs carry only a few fields; fetch each in full.
        let mut subtasks = Vec::with_capacity(stubs.len());
        for stub in &stubs {
            if let Some(subtask_key) = stub.get("key").and_then(Value::as_str) {
                subtasks.push(self.get_issue(subtask_key, None, None).await?);
            }
        }
        Ok(subtasks)
    }

    async fn link_issues(
        &self,
        inward_key: &str,
        outward_key: &str,
        link_type: &str,
    ) -> JiraResult<Value> {
        info!(inward_key, outward_key, link_type, "linking issues");
        self.execute(
            Method::POST,
            "/issueLink",
            &[],
            Some(&json!({
                "type": { "name": link_type },
                "inwardIssue": { "key": inward_key },
                "outwardIssue": { "key": outward_key },
            })),
        )
        .await
    }

    async fn assign_issue(&self, key: &str, assignee: &str) -> JiraResult<Value> {
        info!(key, "assigning issue");
        self.execute(
            Method::PUT,
            &format!("/issue/{key}/assignee"),
            &[],
            Some(&assignee_field(self.settings.auth.is_cloud(), assignee)),
        )
        .await
    }

    async fn search_users(&self, query: &str, max_results: u32) -> JiraResult<Value> {
        // The API rejects an empty query; "." matches most users.
        let query = if query.is_empty() { "." } else { query };
        self.execute(
            Method::GET,
            "/user/search",
            &[
                ("query".to_string(), query.to_string()),
                ("maxResults".to_string(), max_results.to_string()),
            ],
            None,
        )
        .await
    }

    async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> JiraResult<Value> {
        warn!(key, delete_subtasks, "deleting issue");
        self.execute(
            Method::DELETE,
            &format!("/issue/{key}"),
            &[("deleteSubtasks".to_string(), delete_subtasks.to_string())],
            None,
        )
        .await
    }

    async fn get_project_statuses(&self, project_key: &str) -> JiraResult<Value> {
        let raw = self
            .execute(Method::GET, &format!("/project/{project_key}/statuses"), &[], None)
            .await?;
        Ok(summarize_project_statuses(project_key, &raw))
    }
}
