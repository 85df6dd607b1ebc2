/// Runtime configuration for the Jira MCP server.
///
/// Settings are resolved once at startup from environment variables (with
/// `.env` support via dotenv). The credential pair is validated here so a
/// misconfigured server fails fast instead of issuing a request with empty
/// credentials.
use std::env;
use std::time::Duration;

use crate::jira::error::JiraError;

/// Authentication credentials for the Jira REST API.
///
/// Cloud instances authenticate with email + API token, Server/Data Center
/// instances with username + password. Exactly one pair is in effect.
#[derive(Clone)]
pub enum AuthPair {
    Cloud { email: String, token: String },
    Server { username: String, password: String },
}

// The secret half must never leak through Debug formatting.
impl std::fmt::Debug for AuthPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthPair::Cloud { email, .. } => f
                .debug_struct("Cloud")
                .field("email", email)
                .field("token", &"<redacted>")
                .finish(),
            AuthPair::Server { username, .. } => f
                .debug_struct("Server")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

impl AuthPair {
    /// The user-identifying half of the pair. Safe to log.
    pub fn principal(&self) -> &str {
        match self {
            AuthPair::Cloud { email, .. } => email,
            AuthPair::Server { username, .. } => username,
        }
    }

    /// The secret half of the pair. Must never appear in logs or errors.
    pub fn secret(&self) -> &str {
        match self {
            AuthPair::Cloud { token, .. } => token,
            AuthPair::Server { password, .. } => password,
        }
    }

    pub fn is_cloud(&self) -> bool {
        matches!(self, AuthPair::Cloud { .. })
    }
}

/// Server settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Jira instance URL, stored without a trailing slash.
    pub jira_url: String,

    /// Resolved authentication pair.
    pub auth: AuthPair,

    /// Default project key used when a tool call omits one.
    pub default_project: Option<String>,

    /// Per-attempt request timeout.
    pub timeout: Duration,

    /// Maximum retry attempts for rate limits and transient network errors.
    pub max_retries: u32,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Requires `JIRA_URL` plus either `JIRA_EMAIL`/`JIRA_API_TOKEN` (Cloud)
    /// or `JIRA_USERNAME`/`JIRA_PASSWORD` (Server). The cloud pair wins when
    /// both are set. Optional: `JIRA_PROJECT_KEY`, `JIRA_TIMEOUT` (seconds,
    /// default 30), `JIRA_MAX_RETRIES` (default 3).
    pub fn from_env() -> Result<Self, JiraError> {
        let jira_url = env::var("JIRA_URL").map_err(|_| {
            JiraError::Configuration("JIRA_URL is not set".to_string())
        })?;

        let auth = Self::resolve_auth()?;

        let default_project = env::var("JIRA_PROJECT_KEY").ok().filter(|k| !k.is_empty());

        let timeout_secs = Self::parse_var("JIRA_TIMEOUT", 30)?;
        let max_retries = Self::parse_var("JIRA_MAX_RETRIES", 3)?;

        Ok(Self {
            jira_url: jira_url.trim_end_matches('/').to_string(),
            auth,
            default_project,
            timeout: Duration::from_secs(timeout_secs as u64),
            max_retries,
        })
    }

    fn resolve_auth() -> Result<AuthPair, JiraError> {
        let email = env::var("JIRA_EMAIL").ok().filter(|v| !v.is_empty());
        let token = env::var("JIRA_API_TOKEN").ok().filter(|v| !v.is_empty());
        let username = env::var("JIRA_USERNAME").ok().filter(|v| !v.is_empty());
        let password = env::var("JIRA_PASSWORD").ok().filter(|v| !v.is_empty());

        match (email, token) {
            (Some(email), Some(token)) => return Ok(AuthPair::Cloud { email, token }),
            (Some(_), None) | (None, Some(_)) => {
                return Err(JiraError::Configuration(
                    "Jira Cloud auth requires both JIRA_EMAIL and JIRA_API_TOKEN".to_string(),
                ));
            }
            (None, None) => {}
        }

        match (username, password) {
            (Some(username), Some(password)) => Ok(AuthPair::Server { username, password }),
            (Some(_), None) | (None, Some(_)) => Err(JiraError::Configuration(
                "Jira Server auth requires both JIRA_USERNAME and JIRA_PASSWORD".to_string(),
            )),
            (None, None) => Err(JiraError::Configuration(
                "No Jira credentials configured. Set JIRA_EMAIL/JIRA_API_TOKEN \
                 or JIRA_USERNAME/JIRA_PASSWORD."
                    .to_string(),
            )),
        }
    }

    fn parse_var(name: &str, default: u32) -> Result<u32, JiraError> {
        match env::var(name) {
            Ok(raw) => raw.parse::<u32>().map_err(|_| {
                JiraError::Configuration(format!("{name} must be a non-negative integer"))
            }),
            Err(_) => Ok(default),
        }
    }

    /// Resolve a project key from an explicit argument or the configured
    /// default, failing with a user-actionable message when neither exists.
    pub fn resolve_project<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str, JiraError> {
        explicit
            .or(self.default_project.as_deref())
            .ok_or_else(|| {
                JiraError::Configuration(
                    "No project_key provided and no default project configured. \
                     Specify project_key or set JIRA_PROJECT_KEY."
                        .to_string(),
                )
            })
    }
}
