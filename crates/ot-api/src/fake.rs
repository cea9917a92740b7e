use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::ApiError;
use crate::transport::{ApiResponse, ApiTransport};

/// Canned responses keyed by path. Unknown paths fail as transport errors.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    gets: HashMap<String, ApiResponse>,
    post_routes: HashMap<String, ApiResponse>,
    pub(crate) posts: RefCell<Vec<(String, Value)>>,
    pub(crate) get_calls: RefCell<Vec<String>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_get(mut self, path: &str, status: u16, body: Value) -> Self {
        self.gets.insert(
            path.to_string(),
            ApiResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    pub(crate) fn with_post(self, path: &str, status: u16, body: Value) -> Self {
        self.with_raw_post(path, status, &body.to_string())
    }

    pub(crate) fn with_raw_post(mut self, path: &str, status: u16, body: &str) -> Self {
        self.post_routes.insert(
            path.to_string(),
            ApiResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    fn unrouted(path: &str) -> ApiError {
        ApiError::Transport {
            endpoint: path.to_string(),
            message: "connection refused".to_string(),
        }
    }
}

impl ApiTransport for FakeTransport {
    fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.get_calls.borrow_mut().push(path.to_string());
        self.gets
            .get(path)
            .cloned()
            .ok_or_else(|| Self::unrouted(path))
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.posts
            .borrow_mut()
            .push((path.to_string(), body.clone()));
        self.post_routes
            .get(path)
            .cloned()
            .ok_or_else(|| Self::unrouted(path))
    }
}
