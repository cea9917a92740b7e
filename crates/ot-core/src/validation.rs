//! Validation for run configuration.

use serde::{Deserialize, Serialize};

use crate::config::{PasswordSource, RunConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues
        .iter()
        .any(|issue| issue.level == ValidationLevel::Error)
}

fn error(code: &'static str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        level: ValidationLevel::Error,
        code,
        message: message.into(),
    }
}

fn warning(code: &'static str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        level: ValidationLevel::Warning,
        code,
        message: message.into(),
    }
}

fn looks_like_email(value: &str) -> bool {
    let address = match (value.rfind('<'), value.rfind('>')) {
        (Some(open), Some(close)) if open < close => &value[open + 1..close],
        _ => value,
    };
    let address = address.trim();
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let url = self.instance.url.trim();
        if url.is_empty() {
            issues.push(error("instance.url.empty", "instance url must not be empty"));
        } else if !url.starts_with("https://") && !url.starts_with("http://") {
            issues.push(error(
                "instance.url.scheme",
                "instance url should start with http:// or https://",
            ));
        } else if url.starts_with("http://") {
            issues.push(warning(
                "instance.url.insecure",
                "instance url uses plain http; the bearer token will travel unencrypted",
            ));
        }

        if self.accounts.portal_email.trim().is_empty() {
            issues.push(error(
                "accounts.portal_email.empty",
                "portal_email is required for the first login form",
            ));
        }
        if self.accounts.idp_username.trim().is_empty() {
            issues.push(error(
                "accounts.idp_username.empty",
                "idp_username is required for the identity-provider login",
            ));
        }
        if !looks_like_email(&self.accounts.admin_email) {
            issues.push(error(
                "accounts.admin_email.invalid",
                format!(
                    "admin_email '{}' is not an email address",
                    self.accounts.admin_email
                ),
            ));
        }
        if !looks_like_email(&self.accounts.sender) {
            issues.push(error(
                "accounts.sender.invalid",
                format!(
                    "sender '{}' does not contain an email address",
                    self.accounts.sender
                ),
            ));
        }

        if self.aws.region.trim().is_empty() {
            issues.push(error("aws.region.empty", "aws region must not be empty"));
        }
        match self.aws.password_source() {
            None => issues.push(error(
                "aws.password.missing",
                "set either aws.password_secret or aws.password_env",
            )),
            Some(PasswordSource::SecretsManager { .. }) if self.aws.password_env.is_some() => {
                issues.push(warning(
                    "aws.password.ambiguous",
                    "both password_secret and password_env are set; password_secret wins",
                ));
            }
            Some(_) => {}
        }

        if self.browser.wait_secs == 0 {
            issues.push(error(
                "browser.wait_secs.zero",
                "browser wait of 0s cannot observe any page element",
            ));
        } else if self.browser.wait_secs < 5 {
            issues.push(warning(
                "browser.wait_secs.low",
                format!(
                    "browser wait {}s is very low; the identity provider redirect may not finish",
                    self.browser.wait_secs
                ),
            ));
        }
        if self.browser.port == 0 {
            issues.push(error(
                "browser.port.zero",
                "chromedriver port must be greater than zero",
            ));
        }

        let login_ids = [
            ("login.portal_email_field.empty", &self.login.portal_email_field),
            ("login.idp_username_field.empty", &self.login.idp_username_field),
            ("login.idp_password_field.empty", &self.login.idp_password_field),
            ("login.success_element.empty", &self.login.success_element),
            ("login.token_storage_key.empty", &self.login.token_storage_key),
        ];
        for (code, value) in login_ids {
            if value.trim().is_empty() {
                issues.push(error(code, "login element ids must not be empty"));
            }
        }

        if self.run.max_run_secs == Some(0) {
            issues.push(error(
                "run.max_run_secs.zero",
                "a run budget of 0s would abort before the first task",
            ));
        }

        for (code, template) in [
            ("templates.orphan.subject.empty", &self.templates.orphan),
            ("templates.grouped.subject.empty", &self.templates.grouped),
        ] {
            if template.subject.trim().is_empty() {
                issues.push(warning(code, "message subject is empty"));
            }
        }

        issues
    }
}
