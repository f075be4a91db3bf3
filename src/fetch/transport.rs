use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::fetch::error::FetchError;
use crate::fetch::request::OptionRequest;

/// Executes option requests. Implementations are shared with worker threads.
pub trait OptionTransport: Send + Sync {
    fn get(&self, request: &OptionRequest) -> Result<Value, FetchError>;
}

// ============================================================================
// HTTP Transport
// ============================================================================

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionTransport for HttpTransport {
    fn get(&self, request: &OptionRequest) -> Result<Value, FetchError> {
        debug!(url = %request.full_url(), "GET options");

        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().unwrap_or(Value::Null);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

// ============================================================================
// Mock Transport (for tests and offline runs)
// ============================================================================

/// Canned responses keyed by full URL (query string included). Unknown URLs
/// answer `{"data": []}`. Every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Result<Value, FetchError>>>,
    requests: Mutex<Vec<OptionRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, full_url: &str, body: Value) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(full_url.to_string(), Ok(body));
        }
        self
    }

    pub fn fail(self, full_url: &str, error: FetchError) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(full_url.to_string(), Err(error));
        }
        self
    }

    pub fn requests(&self) -> Vec<OptionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().iter().map(OptionRequest::full_url).collect()
    }
}

impl OptionTransport for MockTransport {
    fn get(&self, request: &OptionRequest) -> Result<Value, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let url = request.full_url();
        self.responses
            .lock()
            .map_err(|e| FetchError::Transport(format!("mock transport lock poisoned: {}", e)))?
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Ok(json!({ "data": [] })))
    }
}
