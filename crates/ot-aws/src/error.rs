use std::string::FromUtf8Error;

#[derive(Debug, thiserror::Error)]
pub enum AwsError {
    #[error("aws command failed to start ({command}): {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("aws command returned non-zero exit ({command}) status={status:?}: {}", .stderr.trim())]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("aws command output was not valid UTF-8 ({command}, {stream}): {source}")]
    NonUtf8Output {
        command: String,
        stream: &'static str,
        #[source]
        source: FromUtf8Error,
    },
    #[error("aws contract violation: {message}")]
    ContractViolation { message: String },
    #[error("unable to parse aws output: {message}")]
    Parse { message: String },
}

impl AwsError {
    /// Service error code reported by a failed call, e.g.
    /// `ResourceNotFoundException`.
    pub fn service_code(&self) -> Option<String> {
        match self {
            AwsError::CommandFailed { stderr, .. } => aws_error_code(stderr),
            _ => None,
        }
    }
}

/// Extracts the error code from the CLI's standard failure line:
/// `An error occurred (Code) when calling the Op operation: ...`.
pub fn aws_error_code(stderr: &str) -> Option<String> {
    let marker = "An error occurred (";
    let start = stderr.find(marker)? + marker.len();
    let rest = &stderr[start..];
    let end = rest.find(')')?;
    let code = rest[..end].trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}
