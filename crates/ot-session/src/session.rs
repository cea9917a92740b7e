//! Turning credentials into an authenticated API session.

use std::collections::BTreeMap;
use std::time::Duration;

use ot_core::{BrowserConfig, Credentials, RunConfig};
use secrecy::SecretString;
use url::Url;

use crate::browser::Browser;
use crate::error::AuthError;
use crate::flow::{run_login_flow, LoginFlow};
use crate::webdriver::WebDriverBrowser;

/// Bearer token plus session cookies, bound to the instance base URL.
///
/// Validity is decided by the remote service; nothing here tracks expiry or
/// refreshes the token.
#[derive(Debug)]
pub struct AuthenticatedSession {
    pub bearer_token: SecretString,
    pub cookies: BTreeMap<String, String>,
    pub base_url: Url,
}

/// Produces an [`AuthenticatedSession`] from credentials. Browser automation
/// is one implementation; a token-exchange API could be another.
pub trait AuthSession {
    fn authenticate(&self, credentials: &Credentials) -> Result<AuthenticatedSession, AuthError>;
}

/// Runs the login flow on `browser` and always ends the browser session,
/// whether or not the login succeeded.
pub fn login_with_browser(
    browser: &mut dyn Browser,
    login_url: &Url,
    flow: &LoginFlow,
    credentials: &Credentials,
) -> Result<AuthenticatedSession, AuthError> {
    let result = run_login_flow(browser, flow, login_url.as_str(), credentials);
    if let Err(err) = browser.quit() {
        tracing::warn!(error = %err, "failed to close browser session");
    }
    let artifacts = result?;
    tracing::info!(
        cookies = artifacts.cookies.len(),
        base_url = %login_url,
        "authenticated"
    );
    Ok(AuthenticatedSession {
        bearer_token: artifacts.bearer_token,
        cookies: artifacts.cookies,
        base_url: login_url.clone(),
    })
}

/// Logs in through a headless Chrome started for the duration of one call.
#[derive(Debug, Clone)]
pub struct BrowserLogin {
    pub login_url: Url,
    pub browser: BrowserConfig,
    pub flow: LoginFlow,
}

impl BrowserLogin {
    pub fn new(login_url: Url, browser: BrowserConfig, flow: LoginFlow) -> Self {
        Self {
            login_url,
            browser,
            flow,
        }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self, AuthError> {
        let login_url = parse_instance_url(&config.instance.url)?;
        let flow = LoginFlow::from_config(
            &config.login,
            Duration::from_secs(config.browser.wait_secs),
        );
        Ok(Self::new(login_url, config.browser.clone(), flow))
    }
}

impl AuthSession for BrowserLogin {
    fn authenticate(&self, credentials: &Credentials) -> Result<AuthenticatedSession, AuthError> {
        tracing::info!(url = %self.login_url, "starting browser login");
        let mut browser = WebDriverBrowser::launch(&self.browser)?;
        login_with_browser(&mut browser, &self.login_url, &self.flow, credentials)
    }
}

pub fn parse_instance_url(raw: &str) -> Result<Url, AuthError> {
    let url = Url::parse(raw.trim()).map_err(|e| AuthError::InvalidInput {
        message: format!("instance url '{raw}' is not a valid url: {e}"),
    })?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(AuthError::InvalidInput {
            message: format!("instance url '{raw}' must use http or https"),
        });
    }
    Ok(url)
}
