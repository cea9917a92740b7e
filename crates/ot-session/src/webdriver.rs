//! W3C WebDriver client for a locally spawned `chromedriver`.
//!
//! Only the handful of commands the login flow needs are implemented: new
//! session, navigate, find element, element send keys, execute script, get
//! cookies and delete session.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use ot_core::BrowserConfig;
use reqwest::blocking::Client;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::browser::{Browser, BrowserCookie, ElementHandle};
use crate::error::AuthError;

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// WebDriver key code for Enter; typing it submits the focused form.
const ENTER_KEY: &str = "\u{E007}";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/87.0.4280.88 Safari/537.36";
const DRIVER_READY_POLL: Duration = Duration::from_millis(100);
const COMMAND_TIMEOUT_SLACK: Duration = Duration::from_secs(60);

/// Chrome arguments for headless runs inside constrained containers
/// (small `/dev/shm`, no user namespaces).
pub fn chrome_arguments(config: &BrowserConfig) -> Vec<String> {
    let mut args = Vec::new();
    if config.headless {
        args.push("--headless".to_string());
    }
    args.extend(
        [
            "--disable-dev-shm-usage",
            "--no-sandbox",
            "--disable-gpu",
            "--window-size=1280x1696",
            "--single-process",
            "--disable-dev-tools",
            "--no-zygote",
        ]
        .iter()
        .map(|arg| arg.to_string()),
    );
    args.push(format!(
        "--user-data-dir={}",
        config.user_data_dir.to_string_lossy()
    ));
    args.push(format!("user-agent={USER_AGENT}"));
    args
}

pub fn session_capabilities(config: &BrowserConfig) -> Value {
    let mut chrome_options = json!({ "args": chrome_arguments(config) });
    if let Some(binary) = &config.chrome_binary {
        chrome_options["binary"] = Value::String(binary.to_string_lossy().into_owned());
    }
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": chrome_options,
            }
        }
    })
}

/// CSS selector matching an element id verbatim, including ids with
/// characters that are special in CSS.
pub fn id_selector(id: &str) -> String {
    let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[id=\"{escaped}\"]")
}

/// Child `chromedriver` process, killed on drop.
#[derive(Debug)]
pub struct DriverProcess {
    child: Child,
}

impl DriverProcess {
    pub fn spawn(config: &BrowserConfig) -> Result<Self, AuthError> {
        let child = Command::new(&config.chromedriver)
            .arg(format!("--port={}", config.port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| AuthError::Spawn {
                binary: config.chromedriver.clone(),
                source,
            })?;
        tracing::debug!(pid = child.id(), port = config.port, "chromedriver started");
        Ok(Self { child })
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

enum CommandFailure {
    NoSuchElement,
    Other(AuthError),
}

impl From<AuthError> for CommandFailure {
    fn from(err: AuthError) -> Self {
        CommandFailure::Other(err)
    }
}

pub struct WebDriverBrowser {
    http: Client,
    endpoint: String,
    session_id: Option<String>,
    // Dropped after the session so the driver outlives the DELETE.
    _driver: DriverProcess,
}

impl WebDriverBrowser {
    /// Starts `chromedriver`, waits for it to accept sessions and opens one.
    pub fn launch(config: &BrowserConfig) -> Result<Self, AuthError> {
        let driver = DriverProcess::spawn(config)?;
        let endpoint = format!("http://127.0.0.1:{}", config.port);
        let http = build_client(config)?;
        wait_until_ready(&http, &endpoint, Duration::from_secs(config.wait_secs))?;
        let mut browser = Self {
            http,
            endpoint,
            session_id: None,
            _driver: driver,
        };
        browser.open_session(config)?;
        Ok(browser)
    }

    fn open_session(&mut self, config: &BrowserConfig) -> Result<(), AuthError> {
        let value = self
            .command(Method::POST, "/session", Some(session_capabilities(config)))
            .map_err(into_auth_error("new session"))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::driver("new session", "response carried no sessionId"))?;
        tracing::debug!(session_id, "webdriver session opened");
        self.session_id = Some(session_id.to_string());
        Ok(())
    }

    fn session_path(&self, suffix: &str) -> Result<String, AuthError> {
        let id = self
            .session_id
            .as_deref()
            .ok_or_else(|| AuthError::driver(suffix, "no open webdriver session"))?;
        Ok(format!("/session/{id}{suffix}"))
    }

    fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, CommandFailure> {
        let url = format!("{}{}", self.endpoint, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .map_err(|e| AuthError::driver(path, e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| AuthError::driver(path, e.to_string()))?;
        let parsed: WireResponse = serde_json::from_str(&text).map_err(|e| {
            AuthError::driver(path, format!("unexpected response (status {status}): {e}"))
        })?;

        if status.is_success() {
            return Ok(parsed.value);
        }

        match serde_json::from_value::<WireError>(parsed.value) {
            Ok(err) if err.error == "no such element" => Err(CommandFailure::NoSuchElement),
            Ok(err) => Err(CommandFailure::Other(AuthError::driver(
                path,
                format!("{}: {}", err.error, err.message),
            ))),
            Err(_) => Err(CommandFailure::Other(AuthError::driver(
                path,
                format!("status {status}"),
            ))),
        }
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), AuthError> {
        let path = self.session_path(&format!("/element/{}/value", element.0))?;
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .map_err(into_auth_error("element send keys"))?;
        Ok(())
    }
}

impl Browser for WebDriverBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), AuthError> {
        let path = self.session_path("/url")?;
        self.command(Method::POST, &path, Some(json!({ "url": url })))
            .map_err(into_auth_error("navigate"))?;
        Ok(())
    }

    fn find_by_id(&mut self, id: &str) -> Result<Option<ElementHandle>, AuthError> {
        let path = self.session_path("/element")?;
        let body = json!({ "using": "css selector", "value": id_selector(id) });
        match self.command(Method::POST, &path, Some(body)) {
            Ok(value) => element_reference(&value).map(Some),
            Err(CommandFailure::NoSuchElement) => Ok(None),
            Err(CommandFailure::Other(err)) => Err(err),
        }
    }

    fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), AuthError> {
        self.send_keys(element, text)
    }

    fn submit(&mut self, element: &ElementHandle) -> Result<(), AuthError> {
        self.send_keys(element, ENTER_KEY)
    }

    fn local_storage_item(&mut self, key: &str) -> Result<Option<String>, AuthError> {
        let path = self.session_path("/execute/sync")?;
        let body = json!({
            "script": "return window.localStorage.getItem(arguments[0]);",
            "args": [key],
        });
        let value = self
            .command(Method::POST, &path, Some(body))
            .map_err(into_auth_error("execute script"))?;
        Ok(value.as_str().map(str::to_string))
    }

    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, AuthError> {
        let path = self.session_path("/cookie")?;
        let value = self
            .command(Method::GET, &path, None)
            .map_err(into_auth_error("get cookies"))?;
        serde_json::from_value(value)
            .map_err(|e| AuthError::driver("get cookies", format!("malformed cookie list: {e}")))
    }

    fn quit(&mut self) -> Result<(), AuthError> {
        let Some(id) = self.session_id.take() else {
            return Ok(());
        };
        self.command(Method::DELETE, &format!("/session/{id}"), None)
            .map_err(into_auth_error("delete session"))?;
        tracing::debug!(session_id = %id, "webdriver session closed");
        Ok(())
    }
}

impl Drop for WebDriverBrowser {
    fn drop(&mut self) {
        if self.session_id.is_some() {
            let _ = self.quit();
        }
    }
}

fn build_client(config: &BrowserConfig) -> Result<Client, AuthError> {
    // Navigation blocks until the page loads, so allow more than one wait.
    Client::builder()
        .timeout(Duration::from_secs(config.wait_secs) + COMMAND_TIMEOUT_SLACK)
        .build()
        .map_err(|e| AuthError::driver("build http client", e.to_string()))
}

fn wait_until_ready(http: &Client, endpoint: &str, wait: Duration) -> Result<(), AuthError> {
    let started = Instant::now();
    let url = format!("{endpoint}/status");
    loop {
        let ready = http
            .get(&url)
            .send()
            .ok()
            .and_then(|response| response.json::<WireResponse>().ok())
            .and_then(|parsed| parsed.value.get("ready").and_then(Value::as_bool))
            .unwrap_or(false);
        if ready {
            return Ok(());
        }
        if started.elapsed() >= wait {
            return Err(AuthError::Timeout {
                stage: "browser driver startup",
                element: "status".to_string(),
                waited: wait,
            });
        }
        thread::sleep(DRIVER_READY_POLL);
    }
}

fn element_reference(value: &Value) -> Result<ElementHandle, AuthError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|reference| ElementHandle(reference.to_string()))
        .ok_or_else(|| AuthError::driver("find element", "response carried no element reference"))
}

fn into_auth_error(operation: &'static str) -> impl Fn(CommandFailure) -> AuthError {
    move |failure| match failure {
        CommandFailure::NoSuchElement => AuthError::driver(operation, "no such element"),
        CommandFailure::Other(err) => err,
    }
}
