// Request pipeline module - per-request context shared by the proxy and the gateway

use std::time::{Duration, Instant};
use uuid::Uuid;

/// Request context that follows one HTTP request from the listener to the
/// response writer
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    method: String,
    path: String,
    client_id: Option<String>,
    started_at: Instant,
}

impl RequestContext {
    /// Create a new RequestContext from HTTP request information
    /// Automatically generates a unique request ID (UUID v4) and starts the clock
    pub fn new(method: String, path: String) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method,
            path,
            client_id: None,
            started_at: Instant::now(),
        }
    }

    /// Context before the request line is known (Pingora creates CTX early)
    pub fn empty() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Get the unique request ID
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Identifier the rate limiter counts against, if any was found
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn set_request_line(&mut self, method: String, path: String) {
        self.method = method;
        self.path = path;
    }

    pub fn set_client_id(&mut self, client_id: Option<String>) {
        self.client_id = client_id;
    }

    /// Time since the context was created
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
