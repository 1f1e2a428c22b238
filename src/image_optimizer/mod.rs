//! Image transformation module
//!
//! Turns stored image bytes into re-encoded bytes:
//! - Decode into an in-memory raster
//! - Resize with nearest-neighbor sampling (no aspect preservation)
//! - Quality as a spatial downscale factor
//! - Encode to PNG, JPEG or WebP
//!
//! # URL Format
//!
//! ```text
//! /photos/cat.png?w=800&h=600&q=50&f=webp
//! ```

pub mod encoder;
pub mod error;
pub mod metrics;
pub mod params;
pub mod processor;

pub use encoder::{EncodedImage, EncoderFactory, ImageEncoder};
pub use error::ImageError;
pub use metrics::{TransformMetrics, TransformationType};
pub use params::{source_format_from_content_type, RequestedFormat, TargetFormat, TransformRequest};
pub use processor::{transform, transform_cancellable, TransformResult};
