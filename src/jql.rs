//! JQL query construction for the ticket-listing tools.

/// A value as a double-quoted JQL string, with embedded quotes escaped so
/// user-supplied text cannot break out of the clause.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// JQL for the current user's assigned tickets, optionally filtered.
pub fn my_tickets(
    status: Option<&str>,
    project: Option<&str>,
    exclude_statuses: &[String],
) -> String {
    let mut parts = vec!["assignee = currentUser()".to_string()];

    if let Some(status) = status {
        parts.push(format!("status = {}", quoted(status)));
    }
    if let Some(project) = project {
        parts.push(format!("project = {}", quoted(project)));
    }
    for excluded in exclude_statuses {
        parts.push(format!("status != {}", quoted(excluded)));
    }

    parts.join(" AND ")
}

/// JQL for the user's highest-priority open ticket. Priority ordering is
/// delegated to the server; the caller takes the first result.
pub fn highest_priority(project: Option<&str>, exclude_statuses: &[String]) -> String {
    format!(
        "{} ORDER BY priority DESC",
        my_tickets(None, project, exclude_statuses)
    )
}

/// JQL for tickets reported by a given user.
pub fn by_creator(creator: &str, project: Option<&str>, status: Option<&str>) -> String {
    let mut parts = vec![format!("reporter={}", quoted(creator))];

    if let Some(project) = project {
        parts.push(format!("project={project}"));
    }
    if let Some(status) = status {
        parts.push(format!("status={}", single_quoted(status)));
    }

    parts.join(" AND ")
}
