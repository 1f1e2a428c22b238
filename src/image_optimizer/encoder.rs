//! Image encoder abstraction
//!
//! One encoder per target format, each with its compression setting fixed:
//! - PNG: lossless
//! - JPEG: lowest quality the codec accepts
//! - WebP: lossy at the libwebp default quality

use std::io::Cursor;

use image::DynamicImage;

use super::error::ImageError;
use super::params::TargetFormat;
use crate::constants::{JPEG_OUTPUT_QUALITY, WEBP_OUTPUT_QUALITY};

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: TargetFormat,
    /// Content-Type header value
    pub content_type: &'static str,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: TargetFormat) -> Self {
        Self {
            data,
            format,
            content_type: format.content_type(),
        }
    }
}

/// Trait for image encoders
///
/// The trait is object-safe so the factory can hand out boxed encoders.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> TargetFormat;

    /// Encode a raster to the target format
    fn encode(&self, img: &DynamicImage) -> Result<EncodedImage, ImageError>;
}

/// JPEG encoder using the image crate
pub struct JpegEncoder {
    quality: u8,
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self {
            quality: JPEG_OUTPUT_QUALITY,
        }
    }
}

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> TargetFormat {
        TargetFormat::Jpeg
    }

    fn encode(&self, img: &DynamicImage) -> Result<EncodedImage, ImageError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;

        // JPEG has no alpha channel
        let rgb = img.to_rgb8();

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, self.quality);

        encoder
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
            .map_err(|e| ImageError::encode_failed("jpeg", e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), TargetFormat::Jpeg))
    }
}

/// PNG encoder using the image crate
///
/// Writes the raster in its decoded color type so an untouched image
/// round-trips pixel for pixel.
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> TargetFormat {
        TargetFormat::Png
    }

    fn encode(&self, img: &DynamicImage) -> Result<EncodedImage, ImageError> {
        let mut output = Cursor::new(Vec::new());

        img.write_to(&mut output, image::ImageOutputFormat::Png)
            .map_err(|e| ImageError::encode_failed("png", e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), TargetFormat::Png))
    }
}

/// Lossy WebP encoder backed by libwebp
pub struct WebPEncoder {
    quality: f32,
}

impl Default for WebPEncoder {
    fn default() -> Self {
        Self {
            quality: WEBP_OUTPUT_QUALITY,
        }
    }
}

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> TargetFormat {
        TargetFormat::WebP
    }

    fn encode(&self, img: &DynamicImage) -> Result<EncodedImage, ImageError> {
        let rgba = img.to_rgba8();

        let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_simple(false, self.quality)
            .map_err(|e| ImageError::encode_failed("webp", format!("{:?}", e)))?;

        Ok(EncodedImage::new(encoded.to_vec(), TargetFormat::WebP))
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    pub fn create(format: TargetFormat) -> Box<dyn ImageEncoder> {
        match format {
            TargetFormat::Png => Box::new(PngEncoder),
            TargetFormat::Jpeg => Box::new(JpegEncoder::default()),
            TargetFormat::WebP => Box::new(WebPEncoder::default()),
        }
    }
}
