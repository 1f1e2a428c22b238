//! Image transformation error types
//!
//! Every variant is terminal for the request. The gateway reports all of
//! them as a generic processing failure; the stage label only feeds logs
//! and metrics.

use std::fmt;

/// Errors that can occur while transforming an image
#[derive(Debug, Clone)]
pub enum ImageError {
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },
    /// Requested dimensions cannot be produced
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },
    /// Caller went away before the pipeline finished
    Cancelled,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ImageError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ImageError::InvalidDimensions {
                width,
                height,
                reason,
            } => {
                write!(f, "Invalid dimensions {}x{}: {}", width, height, reason)
            }
            ImageError::Cancelled => write!(f, "Transform cancelled"),
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    /// Pipeline stage the error came from
    pub fn stage(&self) -> &'static str {
        match self {
            ImageError::DecodeFailed { .. } => "decode",
            ImageError::ResizeFailed { .. } | ImageError::InvalidDimensions { .. } => "resize",
            ImageError::EncodeFailed { .. } => "encode",
            ImageError::Cancelled => "cancelled",
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        ImageError::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }
}
