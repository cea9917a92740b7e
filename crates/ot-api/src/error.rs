#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    /// A response arrived but was unsuccessful or malformed.
    #[error("query {endpoint} failed{}: {message}", status_suffix(.status))]
    Query {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },
    #[error("no group matches '{name}'")]
    GroupNotFound { name: String },
    #[error("failed to list members of group {group_id}{}: {message}", status_suffix(.status))]
    GroupLookup {
        group_id: String,
        status: Option<u16>,
        message: String,
    },
    #[error("invalid api input: {message}")]
    InvalidInput { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (status {code})"))
        .unwrap_or_default()
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}
