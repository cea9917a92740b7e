//! Resolution of named secrets to plaintext credentials.

use secrecy::SecretString;

use crate::command::{AwsCall, AwsCli};
use crate::error::AwsError;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret {name} not found in region {region}")]
    NotFound { name: String, region: String },
    #[error("access to secret {name} in region {region} was denied")]
    AccessDenied { name: String, region: String },
    #[error("secret {name} has no string value")]
    Empty { name: String },
    #[error("environment variable {var} is not set")]
    EnvMissing { var: String },
    #[error(transparent)]
    Cli(#[from] AwsError),
}

pub trait SecretStore {
    fn get_secret(&self, name: &str, region: &str) -> Result<SecretString, SecretError>;
}

/// Secrets Manager through the AWS CLI. Only string secrets are supported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AwsSecretStore {
    pub cli: AwsCli,
}

impl AwsSecretStore {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }
}

impl SecretStore for AwsSecretStore {
    fn get_secret(&self, name: &str, region: &str) -> Result<SecretString, SecretError> {
        let result = self.cli.run(
            AwsCall::GetSecretValue,
            region,
            [
                "secretsmanager",
                "get-secret-value",
                "--secret-id",
                name,
                "--query",
                "SecretString",
                "--output",
                "text",
            ],
        );
        let output = result.map_err(|err| classify_secret_error(err, name, region))?;
        let value = trim_line_ending(&output.stdout);
        // The text output renders a missing SecretString as `None`.
        if value.is_empty() || value == "None" {
            return Err(SecretError::Empty {
                name: name.to_string(),
            });
        }
        tracing::debug!(secret = name, region, "resolved secret");
        Ok(SecretString::from(value.to_string()))
    }
}

/// Reads the secret from an environment variable named `name`; the region is
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get_secret(&self, name: &str, _region: &str) -> Result<SecretString, SecretError> {
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(SecretString::from(value)),
            _ => Err(SecretError::EnvMissing {
                var: name.to_string(),
            }),
        }
    }
}

pub(crate) fn classify_secret_error(err: AwsError, name: &str, region: &str) -> SecretError {
    match err.service_code().as_deref() {
        Some("ResourceNotFoundException") => SecretError::NotFound {
            name: name.to_string(),
            region: region.to_string(),
        },
        Some("AccessDeniedException") => SecretError::AccessDenied {
            name: name.to_string(),
            region: region.to_string(),
        },
        _ => SecretError::Cli(err),
    }
}

fn trim_line_ending(value: &str) -> &str {
    value.trim_end_matches(['\n', '\r'])
}
