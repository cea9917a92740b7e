//! The two-stage login: portal email form, then the identity-provider form.

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use ot_core::{Credentials, LoginConfig};
use secrecy::{ExposeSecret, SecretString};

use crate::browser::{Browser, ElementHandle};
use crate::error::AuthError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFlow {
    pub portal_email_field: String,
    pub idp_username_field: String,
    pub idp_password_field: String,
    pub success_element: String,
    pub rejection_element: Option<String>,
    pub token_storage_key: String,
    /// Bound on every individual element wait.
    pub wait: Duration,
    pub poll_interval: Duration,
}

impl LoginFlow {
    pub fn from_config(login: &LoginConfig, wait: Duration) -> Self {
        Self {
            portal_email_field: login.portal_email_field.clone(),
            idp_username_field: login.idp_username_field.clone(),
            idp_password_field: login.idp_password_field.clone(),
            success_element: login.success_element.clone(),
            rejection_element: login
                .rejection_element
                .clone()
                .filter(|id| !id.trim().is_empty()),
            token_storage_key: login.token_storage_key.clone(),
            wait,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// What a successful login leaves behind in the browser.
#[derive(Debug)]
pub struct LoginArtifacts {
    pub bearer_token: SecretString,
    pub cookies: BTreeMap<String, String>,
}

enum Outcome {
    Success,
    Rejected(String),
}

pub fn run_login_flow(
    browser: &mut dyn Browser,
    flow: &LoginFlow,
    login_url: &str,
    credentials: &Credentials,
) -> Result<LoginArtifacts, AuthError> {
    if credentials.portal_email.trim().is_empty() || credentials.idp_username.trim().is_empty() {
        return Err(AuthError::InvalidInput {
            message: "portal email and identity-provider username must not be empty".to_string(),
        });
    }

    browser.navigate(login_url)?;

    let email = wait_for(browser, flow, &flow.portal_email_field, "portal login form")?;
    browser.type_text(&email, &credentials.portal_email)?;
    browser.submit(&email)?;
    tracing::debug!("portal email submitted");

    let username = wait_for(browser, flow, &flow.idp_username_field, "identity provider form")?;
    let password = wait_for(browser, flow, &flow.idp_password_field, "identity provider form")?;
    browser.type_text(&username, &credentials.idp_username)?;
    browser.type_text(&password, credentials.idp_password.expose_secret())?;
    browser.submit(&password)?;
    tracing::debug!("identity provider credentials submitted");

    match wait_for_outcome(browser, flow)? {
        Outcome::Success => {}
        Outcome::Rejected(element) => return Err(AuthError::Rejected { element }),
    }

    let bearer_token = browser
        .local_storage_item(&flow.token_storage_key)?
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| AuthError::TokenMissing {
            key: flow.token_storage_key.clone(),
        })?;
    let cookies = browser
        .cookies()?
        .into_iter()
        .map(|cookie| (cookie.name, cookie.value))
        .collect::<BTreeMap<_, _>>();

    Ok(LoginArtifacts {
        bearer_token: SecretString::from(bearer_token),
        cookies,
    })
}

fn wait_for(
    browser: &mut dyn Browser,
    flow: &LoginFlow,
    element: &str,
    stage: &'static str,
) -> Result<ElementHandle, AuthError> {
    let started = Instant::now();
    loop {
        if let Some(handle) = browser.find_by_id(element)? {
            return Ok(handle);
        }
        pause_or_timeout(flow, started, stage, element)?;
    }
}

fn wait_for_outcome(browser: &mut dyn Browser, flow: &LoginFlow) -> Result<Outcome, AuthError> {
    let started = Instant::now();
    loop {
        if browser.find_by_id(&flow.success_element)?.is_some() {
            return Ok(Outcome::Success);
        }
        if let Some(rejection) = &flow.rejection_element {
            if browser.find_by_id(rejection)?.is_some() {
                return Ok(Outcome::Rejected(rejection.clone()));
            }
        }
        pause_or_timeout(flow, started, "login success", &flow.success_element)?;
    }
}

fn pause_or_timeout(
    flow: &LoginFlow,
    started: Instant,
    stage: &'static str,
    element: &str,
) -> Result<(), AuthError> {
    let elapsed = started.elapsed();
    if elapsed >= flow.wait {
        return Err(AuthError::Timeout {
            stage,
            element: element.to_string(),
            waited: flow.wait,
        });
    }
    thread::sleep(flow.poll_interval.min(flow.wait - elapsed));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBrowser;

    fn flow() -> LoginFlow {
        LoginFlow::from_config(&LoginConfig::default(), Duration::from_millis(60))
            .with_poll_interval(Duration::from_millis(5))
    }

    fn creds() -> Credentials {
        Credentials::new(
            "me@example.com",
            "okta-me",
            SecretString::from("s3cret".to_string()),
        )
    }

    #[test]
    fn happy_path_fills_both_forms_and_collects_session() {
        let mut browser = FakeBrowser::happy_path();
        let artifacts = run_login_flow(&mut browser, &flow(), "https://ot.example/", &creds())
            .expect("login");

        assert_eq!(artifacts.bearer_token.expose_secret(), "token-123");
        assert_eq!(
            artifacts.cookies.get("JSESSIONID").map(String::as_str),
            Some("abc")
        );
        assert_eq!(browser.navigated, vec!["https://ot.example/".to_string()]);
        assert_eq!(
            browser.typed,
            vec![
                ("ot_form-element_0".to_string(), "me@example.com".to_string()),
                ("okta-signin-username".to_string(), "okta-me".to_string()),
                ("okta-signin-password".to_string(), "s3cret".to_string()),
            ]
        );
        assert_eq!(browser.submits, 2);
    }

    #[test]
    fn missing_success_element_times_out() {
        let mut browser = FakeBrowser::happy_path().without("MyApps");
        let err = run_login_flow(&mut browser, &flow(), "https://ot.example/", &creds())
            .expect_err("login must time out");
        assert!(
            matches!(err, AuthError::Timeout { ref element, stage, .. } if element == "MyApps" && stage == "login success")
        );
    }

    #[test]
    fn missing_idp_form_times_out_at_that_stage() {
        let mut browser = FakeBrowser::happy_path().without("okta-signin-password");
        let err = run_login_flow(&mut browser, &flow(), "https://ot.example/", &creds())
            .expect_err("login must time out");
        assert!(
            matches!(err, AuthError::Timeout { ref element, .. } if element == "okta-signin-password")
        );
        assert_eq!(browser.submits, 1);
    }

    #[test]
    fn rejection_marker_is_reported_as_rejected() {
        let mut browser = FakeBrowser::happy_path()
            .without("MyApps")
            .with_element("okta-error", 2);
        let mut flow = flow();
        flow.rejection_element = Some("okta-error".to_string());
        let err = run_login_flow(&mut browser, &flow, "https://ot.example/", &creds())
            .expect_err("login must be rejected");
        assert!(matches!(err, AuthError::Rejected { ref element } if element == "okta-error"));
    }

    #[test]
    fn empty_token_is_token_missing() {
        let mut browser = FakeBrowser::happy_path();
        browser
            .local_storage
            .insert("access_token".to_string(), "  ".to_string());
        let err = run_login_flow(&mut browser, &flow(), "https://ot.example/", &creds())
            .expect_err("blank token must fail");
        assert!(matches!(err, AuthError::TokenMissing { ref key } if key == "access_token"));
    }

    #[test]
    fn blank_credentials_fail_before_navigation() {
        let mut browser = FakeBrowser::happy_path();
        let blank = Credentials::new(" ", "me", SecretString::from("pw".to_string()));
        let err = run_login_flow(&mut browser, &flow(), "https://ot.example/", &blank)
            .expect_err("blank email must fail");
        assert!(matches!(err, AuthError::InvalidInput { .. }));
        assert!(browser.navigated.is_empty());
    }

    #[test]
    fn blank_rejection_element_is_ignored() {
        let login = LoginConfig {
            rejection_element: Some("  ".to_string()),
            ..LoginConfig::default()
        };
        let flow = LoginFlow::from_config(&login, Duration::from_secs(1));
        assert_eq!(flow.rejection_element, None);
    }
}
