//! Run configuration loaded from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Everything one notification run needs. Replaces the hard-coded URLs,
/// paths and prompts of an interactive session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub instance: InstanceConfig,
    pub accounts: AccountsConfig,
    pub aws: AwsConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub run: RunLimits,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Base URL of the OneTrust instance, e.g. `https://uat.onetrust.com/`.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Email entered on the portal's first login form.
    pub portal_email: String,
    /// Username for the identity-provider login.
    pub idp_username: String,
    /// Always receives every notification; sole recipient for orphan tasks.
    pub admin_email: String,
    /// `From` address, optionally with a display name.
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    /// Secrets Manager id holding the identity-provider password.
    #[serde(default)]
    pub password_secret: Option<String>,
    /// Environment variable holding the password, for local runs.
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default = "default_aws_binary")]
    pub aws_binary: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    SecretsManager { secret_id: String },
    Env { var: String },
}

impl AwsConfig {
    /// Returns the configured password source, preferring Secrets Manager.
    pub fn password_source(&self) -> Option<PasswordSource> {
        if let Some(secret_id) = non_blank(self.password_secret.as_deref()) {
            return Some(PasswordSource::SecretsManager {
                secret_id: secret_id.to_string(),
            });
        }
        non_blank(self.password_env.as_deref()).map(|var| PasswordSource::Env {
            var: var.to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn default_aws_binary() -> PathBuf {
    PathBuf::from("aws")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chromedriver: PathBuf,
    pub chrome_binary: Option<PathBuf>,
    pub port: u16,
    /// Upper bound on each page-load or element wait during login.
    pub wait_secs: u64,
    pub user_data_dir: PathBuf,
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chromedriver: PathBuf::from("chromedriver"),
            chrome_binary: None,
            port: 9515,
            wait_secs: 30,
            user_data_dir: PathBuf::from("/tmp/chrome-user-data"),
            headless: true,
        }
    }
}

/// Element ids of the login pages. These track whatever the remote UI
/// currently renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub portal_email_field: String,
    pub idp_username_field: String,
    pub idp_password_field: String,
    pub success_element: String,
    pub rejection_element: Option<String>,
    pub token_storage_key: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            portal_email_field: "ot_form-element_0".to_string(),
            idp_username_field: "okta-signin-username".to_string(),
            idp_password_field: "okta-signin-password".to_string(),
            success_element: "MyApps".to_string(),
            rejection_element: None,
            token_storage_key: "access_token".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Wall-clock budget for the notification loop. `None` means unbounded.
    pub max_run_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub orphan: MessageTemplate,
    pub grouped: MessageTemplate,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            orphan: MessageTemplate {
                subject: "Unassigned overdue subtask: {task_name}".to_string(),
                body: "Subtask \"{task_name}\" ({task_id}) passed its deadline of {deadline} \
                       and has no assigned group.\n\nReview it at {instance_url}\n"
                    .to_string(),
            },
            grouped: MessageTemplate {
                subject: "Overdue subtask for {assignee}: {task_name}".to_string(),
                body: "Subtask \"{task_name}\" ({task_id}) assigned to {assignee} passed its \
                       deadline of {deadline}.\n\nPlease complete it at {instance_url}\n"
                    .to_string(),
            },
        }
    }
}

pub fn parse_run_config(contents: &str) -> Result<RunConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig, ConfigError> {
    let path_ref = path.as_ref();
    let body = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_run_config(&body).map_err(|source| ConfigError::Parse {
        path: path_ref.to_path_buf(),
        source,
    })
}
