// Error types module

use thiserror::Error;

use crate::image_optimizer::ImageError;
use crate::rate_limit::CounterStoreError;
use crate::storage::StorageError;

/// Centralized error type for the gateway
///
/// Every variant maps to exactly one HTTP status and one plain-text body.
/// Internal causes are carried for logging only and never reach the client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Requested object is absent from the object store
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Auth is required for this method and the bearer token is absent or wrong
    #[error("missing or invalid bearer token")]
    Unauthorized,

    /// Client exceeded its request budget for the current window
    #[error("rate limit exceeded for {client_id}")]
    RateLimited { client_id: String },

    /// Upload is missing its body or filename
    #[error("bad request: {0}")]
    BadRequest(BadRequestReason),

    /// Upload body larger than the configured limit
    #[error("upload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Method/path combination the gateway does not serve
    #[error("method {method} not allowed")]
    MethodNotAllowed { method: String },

    /// Any decode/resize/encode failure or internal fault
    #[error("processing failed: {0}")]
    Processing(String),
}

/// Why an upload was rejected as a bad request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadRequestReason {
    MissingBody,
    MissingFilename,
}

impl std::fmt::Display for BadRequestReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BadRequestReason::MissingBody => write!(f, "no file uploaded"),
            BadRequestReason::MissingFilename => write!(f, "missing filename parameter"),
        }
    }
}

impl GatewayError {
    /// HTTP status code for this error
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::NotFound { .. } => 404,
            GatewayError::Unauthorized => 401,
            GatewayError::RateLimited { .. } => 429,
            GatewayError::BadRequest(_) => 400,
            GatewayError::PayloadTooLarge { .. } => 413,
            GatewayError::MethodNotAllowed { .. } => 405,
            GatewayError::Processing(_) => 500,
        }
    }

    /// Body returned to the client
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::NotFound { .. } => "Resource not found",
            GatewayError::Unauthorized => "Unauthorized",
            GatewayError::RateLimited { .. } => "Rate limit exceeded",
            GatewayError::BadRequest(BadRequestReason::MissingBody) => "No file uploaded",
            GatewayError::BadRequest(BadRequestReason::MissingFilename) => {
                "Missing filename parameter"
            }
            GatewayError::PayloadTooLarge { .. } => "Payload too large",
            GatewayError::MethodNotAllowed { .. } => "Method Not Allowed",
            GatewayError::Processing(_) => "Error processing image",
        }
    }

    /// Short label used in metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::BadRequest(_) => "bad_request",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
            GatewayError::MethodNotAllowed { .. } => "method_not_allowed",
            GatewayError::Processing(_) => "processing",
        }
    }
}

impl From<ImageError> for GatewayError {
    fn from(err: ImageError) -> Self {
        GatewayError::Processing(err.to_string())
    }
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        GatewayError::Processing(err.to_string())
    }
}

impl From<CounterStoreError> for GatewayError {
    fn from(err: CounterStoreError) -> Self {
        GatewayError::Processing(err.to_string())
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        GatewayError::Processing(format!("transform task aborted: {}", err))
    }
}
