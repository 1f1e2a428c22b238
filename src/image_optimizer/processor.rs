//! Image processing implementation
//!
//! Handles the actual image transformation: decode → resize → quality
//! rescale → encode. Each step takes the raster by value and returns its
//! replacement, so a superseded raster is dropped as soon as the next one
//! exists.

use std::io::Cursor;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use fast_image_resize::{Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::DynamicImage;

use super::encoder::EncoderFactory;
use super::error::ImageError;
use super::metrics::{TransformMetrics, TransformationType};
use super::params::{TargetFormat, TransformRequest};
use crate::constants::MAX_OUTPUT_PIXELS;

/// Result of a transform
#[derive(Debug)]
pub struct TransformResult {
    /// The encoded image data
    pub bytes: Vec<u8>,
    /// Content-Type header value, `image/<format>`
    pub media_type: &'static str,
    /// Encoder that produced `bytes`
    pub format: TargetFormat,
    /// What the pipeline did, for logging and metrics
    pub metrics: TransformMetrics,
}

/// Run the full pipeline over encoded image bytes
///
/// # Returns
/// * `Ok(TransformResult)` - Encoded output and its media type
/// * `Err(ImageError)` - Decode, resize or encode failed; nothing is produced
pub fn transform(data: &[u8], request: &TransformRequest) -> Result<TransformResult, ImageError> {
    transform_cancellable(data, request, &AtomicBool::new(false))
}

/// Same as [`transform`], but gives up between steps once `cancelled` is set
///
/// The current raster is dropped on the way out.
pub fn transform_cancellable(
    data: &[u8],
    request: &TransformRequest,
    cancelled: &AtomicBool,
) -> Result<TransformResult, ImageError> {
    let started = Instant::now();
    let mut transformations = Vec::new();
    let checkpoint = || {
        if cancelled.load(Ordering::Relaxed) {
            Err(ImageError::Cancelled)
        } else {
            Ok(())
        }
    };

    // 1. Decode
    checkpoint()?;
    let decoded = decode_image(data)?;
    let original_size = (decoded.width(), decoded.height());

    // 2. Resize (no aspect preservation)
    checkpoint()?;
    let mut working = decoded;
    if let Some((w, h)) = resize_dimensions(original_size, request.width, request.height) {
        if (w, h) != (working.width(), working.height()) {
            working = resize_nearest(working, w, h)?;
        }
        transformations.push(TransformationType::Resize);
    }

    // 3. Quality as a spatial downscale of the current raster
    checkpoint()?;
    if let Some(percent) = request.quality_percent() {
        let (w, h) = scale_dimensions((working.width(), working.height()), percent);
        working = resize_nearest(working, w, h)?;
        transformations.push(TransformationType::QualityRescale);
    }

    // 4. Encode
    checkpoint()?;
    let format = request.resolve_format();
    if format.as_str() != request.source_format.to_ascii_lowercase() {
        transformations.push(TransformationType::FormatConversion);
    }
    let output_size = (working.width(), working.height());
    let encoded = EncoderFactory::create(format).encode(&working)?;
    drop(working);

    let metrics = TransformMetrics {
        original_size: data.len(),
        processed_size: encoded.data.len(),
        original_dimensions: original_size,
        processed_dimensions: output_size,
        output_format: format,
        processing_time: started.elapsed(),
        transformations,
    };

    Ok(TransformResult {
        bytes: encoded.data,
        media_type: encoded.content_type,
        format: encoded.format,
        metrics,
    })
}

/// Decode image data into a DynamicImage
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Target dimensions for the resize step
///
/// Returns `None` when neither dimension is given. A missing dimension keeps
/// the current value of that axis.
pub fn resize_dimensions(
    current: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    let width = width.filter(|w| *w > 0);
    let height = height.filter(|h| *h > 0);

    if width.is_none() && height.is_none() {
        return None;
    }

    Some((width.unwrap_or(current.0), height.unwrap_or(current.1)))
}

/// Scale both dimensions to `percent` of their size, truncating toward zero
pub fn scale_dimensions(current: (u32, u32), percent: u32) -> (u32, u32) {
    let scale = |dim: u32| (dim as u64 * percent as u64 / 100) as u32;
    (scale(current.0), scale(current.1))
}

/// Resize using fast-image-resize with nearest-neighbor sampling
///
/// Consumes the source raster; the RGBA buffer it is converted into is
/// released before the function returns.
fn resize_nearest(
    img: DynamicImage,
    target_w: u32,
    target_h: u32,
) -> Result<DynamicImage, ImageError> {
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let pixels = target_w as u64 * target_h as u64;
    if pixels > MAX_OUTPUT_PIXELS {
        return Err(ImageError::invalid_dimensions(
            target_w,
            target_h,
            format!("{} pixels exceeds limit of {}", pixels, MAX_OUTPUT_PIXELS),
        ));
    }

    let src_width =
        NonZeroU32::new(img.width()).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.into_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Nearest);
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;
    drop(src_image);

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
