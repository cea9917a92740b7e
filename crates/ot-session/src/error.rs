use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// An expected page element never appeared. Also what a rejected login
    /// looks like when no rejection marker is configured.
    #[error("timed out after {waited:?} waiting for #{element} ({stage})")]
    Timeout {
        stage: &'static str,
        element: String,
        waited: Duration,
    },
    #[error("identity provider rejected the credentials (#{element} appeared)")]
    Rejected { element: String },
    #[error("login completed but local storage has no '{key}' entry")]
    TokenMissing { key: String },
    #[error("webdriver {operation} failed: {message}")]
    Driver { operation: String, message: String },
    #[error("failed to start browser driver {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid login input: {message}")]
    InvalidInput { message: String },
}

impl AuthError {
    pub fn driver(operation: impl Into<String>, message: impl Into<String>) -> Self {
        AuthError::Driver {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AuthError::Timeout { .. })
    }
}
