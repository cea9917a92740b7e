//! Authenticated HTTP transport for the instance API.

use std::sync::Arc;
use std::time::Duration;

use ot_session::AuthenticatedSession;
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::ExposeSecret;
use serde_json::Value;
use url::Url;

use crate::error::ApiError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues requests against paths relative to the instance base URL.
pub trait ApiTransport {
    fn get(&self, path: &str) -> Result<ApiResponse, ApiError>;
    fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError>;
}

/// `reqwest` transport carrying the session's bearer token and cookies.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(session: &AuthenticatedSession) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            session.bearer_token.expose_secret()
        ))
        .map_err(|_| ApiError::InvalidInput {
            message: "bearer token contains characters not allowed in a header".to_string(),
        })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let jar = Arc::new(Jar::default());
        for (name, value) in &session.cookies {
            jar.add_cookie_str(&format!("{name}={value}"), &session.base_url);
        }

        let http = Client::builder()
            .default_headers(headers)
            .cookie_provider(jar)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport {
                endpoint: session.base_url.to_string(),
                message: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: session.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        join_endpoint(&self.base_url, path)
    }

    fn read(
        path: &str,
        result: reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<ApiResponse, ApiError> {
        let response = result.map_err(|e| ApiError::Transport {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| ApiError::Transport {
            endpoint: path.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;
        tracing::debug!(endpoint = path, status, bytes = body.len(), "api response");
        Ok(ApiResponse { status, body })
    }
}

impl ApiTransport for HttpTransport {
    fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        let url = self.endpoint(path)?;
        Self::read(path, self.http.get(url).send())
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        let url = self.endpoint(path)?;
        Self::read(path, self.http.post(url).json(body).send())
    }
}

/// Appends `path` (which may carry a query string) to the base URL, keeping
/// any path prefix the base URL already has.
pub fn join_endpoint(base_url: &Url, path: &str) -> Result<Url, ApiError> {
    let joined = format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| ApiError::InvalidInput {
        message: format!("cannot build endpoint url from '{path}': {e}"),
    })
}
