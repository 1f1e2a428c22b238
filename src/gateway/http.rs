//! Transport-free request and response types.
//!
//! The proxy converts Pingora sessions into [`GatewayRequest`]s and writes
//! [`GatewayResponse`]s back; tests build them directly.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

use crate::constants::UPLOAD_PATH;
use crate::error::GatewayError;

/// Which handler serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Upload,
    Fetch,
    NotAllowed,
}

impl Route {
    /// PUT on the upload path stores; any GET fetches; everything else is 405
    pub fn resolve(method: &str, path: &str) -> Self {
        if method.eq_ignore_ascii_case("PUT") && path == UPLOAD_PATH {
            Route::Upload
        } else if method.eq_ignore_ascii_case("GET") {
            Route::Fetch
        } else {
            Route::NotAllowed
        }
    }
}

/// Where an upload body comes from
///
/// Pulled only after the rate limiter and the token check admit the request.
#[async_trait]
pub trait RequestBody: Send {
    /// Read the whole body, stopping early once it grows past `limit` bytes
    ///
    /// `Ok(None)` means the request carried no body.
    async fn read_body(&mut self, limit: usize) -> Result<Option<Bytes>, GatewayError>;
}

/// An already buffered body is read once
#[async_trait]
impl RequestBody for Option<Bytes> {
    async fn read_body(&mut self, _limit: usize) -> Result<Option<Bytes>, GatewayError> {
        Ok(self.take())
    }
}

/// One inbound request, already detached from the transport
#[derive(Debug, Clone, Default)]
pub struct GatewayRequest {
    pub method: String,
    /// Raw (still percent-encoded) path, including the leading '/'
    pub path: String,
    /// Decoded query parameters
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    /// Identifier the rate limiter counts against
    pub client_id: Option<String>,
    pub body: Option<Bytes>,
}

impl GatewayRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Header value, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn route(&self) -> Route {
        Route::resolve(&self.method, &self.path)
    }

    /// Object key addressed by the path: leading '/' removed, percent-decoded
    ///
    /// `None` for the root path.
    pub fn object_key(&self) -> Option<String> {
        let raw = self.path.strip_prefix('/').unwrap_or(&self.path);
        if raw.is_empty() {
            return None;
        }

        let key = urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        Some(key)
    }
}

/// Response produced by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl GatewayResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Plain-text response
    pub fn text(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, message.into()).with_header("Content-Type", "text/plain")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header with this name, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl From<&GatewayError> for GatewayResponse {
    fn from(err: &GatewayError) -> Self {
        GatewayResponse::text(err.status(), err.public_message())
    }
}
