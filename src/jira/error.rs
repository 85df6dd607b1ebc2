use serde_json::Value;

/// Result alias for Jira client operations
pub type JiraResult<T> = Result<T, JiraError>;

/// Error taxonomy for the Jira REST API surface.
///
/// Each variant maps a distinct failure class: API responses that the caller
/// can act on, transport failures after retries are exhausted, and local
/// configuration problems that never reach the network. Messages are
/// user-facing; credentials must never appear in a message or in `details`.
#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("Authentication failed. Check your credentials.")]
    AuthenticationFailed,

    #[error("Ticket not found or you don't have permission to view it.")]
    ResourceNotFound { details: Option<Value> },

    #[error("Invalid request. Check your parameters.")]
    ValidationFailed { details: Option<Value> },

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimitExceeded,

    #[error("Cannot transition to '{target}'. Available: {}", available.join(", "))]
    InvalidTransition {
        target: String,
        available: Vec<String>,
    },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Jira API error: {status}")]
    GenericApi { status: u16, details: Option<Value> },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl JiraError {
    /// HTTP status associated with the error, when one exists.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            JiraError::AuthenticationFailed => Some(401),
            JiraError::ResourceNotFound { .. } => Some(404),
            JiraError::ValidationFailed { .. } => Some(400),
            JiraError::RateLimitExceeded => Some(429),
            JiraError::GenericApi { status, .. } => Some(*status),
            JiraError::InvalidTransition { .. }
            | JiraError::RequestFailed(_)
            | JiraError::Configuration(_) => None,
        }
    }

    /// Response payload carried by the error, when the API returned one.
    pub fn details(&self) -> Option<&Value> {
        match self {
            JiraError::ResourceNotFound { details }
            | JiraError::ValidationFailed { details }
            | JiraError::GenericApi { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_transition_enumerates_targets() {
        let err = JiraError::InvalidTransition {
            target: "Done".to_string(),
            available: vec!["To Do".to_string(), "In Progress".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'Done'"));
        assert!(msg.contains("To Do"));
        assert!(msg.contains("In Progress"));
    }

    #[test]
    fn status_codes_match_variants() {
        assert_eq!(JiraError::AuthenticationFailed.status_code(), Some(401));
        assert_eq!(
            JiraError::ResourceNotFound { details: None }.status_code(),
            Some(404)
        );
        assert_eq!(
            JiraError::ValidationFailed { details: None }.status_code(),
            Some(400)
        );
        assert_eq!(JiraError::RateLimitExceeded.status_code(), Some(429));
        assert_eq!(
            JiraError::GenericApi {
                status: 410,
                details: None
            }
            .status_code(),
            Some(410)
        );
        assert_eq!(
            JiraError::RequestFailed("timeout".to_string()).status_code(),
            None
        );
    }

    #[test]
    fn details_surface_api_payload() {
        let err = JiraError::ValidationFailed {
            details: Some(json!({"errorMessages": ["summary is required"]})),
        };
        assert!(err.details().is_some());
        assert!(JiraError::AuthenticationFailed.details().is_none());
    }
}
