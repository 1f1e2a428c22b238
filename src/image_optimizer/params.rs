//! Image transformation parameter parsing
//!
//! Parameters arrive as query string values on a GET:
//! `?w=800&h=600&q=50&f=webp`
//!
//! Invalid numeric values are dropped rather than rejected, so a malformed
//! `w` behaves exactly like an absent one.

use std::collections::HashMap;

/// Encodings the transformer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Png,
    Jpeg,
    WebP,
}

impl TargetFormat {
    /// Map a format name to an encoder. Anything unrecognized encodes as WebP.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => TargetFormat::Png,
            "jpeg" | "jpg" => TargetFormat::Jpeg,
            _ => TargetFormat::WebP,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }
}

/// Format requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestedFormat {
    /// Keep the source format
    #[default]
    Auto,
    /// Re-encode into the given format
    Explicit(TargetFormat),
}

impl RequestedFormat {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("auto") {
            RequestedFormat::Auto
        } else {
            RequestedFormat::Explicit(TargetFormat::parse_lenient(s))
        }
    }
}

/// One transform, built from a request's query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Target width in pixels
    pub width: Option<u32>,
    /// Target height in pixels
    pub height: Option<u32>,
    /// Spatial downscale percentage, applied only when strictly inside (0, 100)
    pub quality: Option<u32>,
    /// Requested output format
    pub format: RequestedFormat,
    /// Format of the stored bytes, e.g. "png"
    pub source_format: String,
}

impl TransformRequest {
    /// A request that changes nothing about a source of the given format
    pub fn new(source_format: impl Into<String>) -> Self {
        Self {
            width: None,
            height: None,
            quality: None,
            format: RequestedFormat::Auto,
            source_format: source_format.into(),
        }
    }

    /// Parse `w`, `h`, `q` and `f` from decoded query parameters
    pub fn from_query(query: &HashMap<String, String>, source_format: impl Into<String>) -> Self {
        Self {
            width: parse_positive(query.get("w")),
            height: parse_positive(query.get("h")),
            quality: parse_positive(query.get("q")),
            format: query
                .get("f")
                .map(|f| RequestedFormat::parse(f))
                .unwrap_or_default(),
            source_format: source_format.into(),
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_format(mut self, format: RequestedFormat) -> Self {
        self.format = format;
        self
    }

    /// Quality as a downscale percentage, if it falls strictly between 0 and 100
    pub fn quality_percent(&self) -> Option<u32> {
        self.quality.filter(|q| *q > 0 && *q < 100)
    }

    /// Whether the request resizes along any axis
    pub fn has_resize(&self) -> bool {
        self.width.is_some_and(|w| w > 0) || self.height.is_some_and(|h| h > 0)
    }

    /// True when the stored bytes can be returned without decoding
    pub fn is_identity(&self) -> bool {
        !self.has_resize()
            && self.quality_percent().is_none()
            && self.format == RequestedFormat::Auto
    }

    /// Encoder to use: the requested format, or the source format for `auto`
    pub fn resolve_format(&self) -> TargetFormat {
        match self.format {
            RequestedFormat::Auto => TargetFormat::parse_lenient(&self.source_format),
            RequestedFormat::Explicit(format) => format,
        }
    }
}

/// Extract the format name from a content type: `image/png` -> `png`
pub fn source_format_from_content_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.split_once('/') {
        Some((_, subtype)) if !subtype.is_empty() => subtype.to_string(),
        _ => essence,
    }
}

fn parse_positive(value: Option<&String>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}
