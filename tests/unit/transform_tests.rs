// Unit tests for the public image transform API

use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use imgate::image_optimizer::{
    transform, RequestedFormat, TargetFormat, TransformRequest, TransformationType,
};
use rstest::rstest;
use std::io::Cursor;

fn checkerboard(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    }))
}

fn png(img: &DynamicImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Png).unwrap();
    buffer.into_inner()
}

fn dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

#[rstest]
#[case(Some(50), None, None, (50, 100))]
#[case(None, Some(25), None, (200, 25))]
#[case(Some(10), Some(10), None, (10, 10))]
#[case(None, None, Some(50), (100, 50))]
#[case(None, None, Some(99), (198, 99))]
#[case(Some(100), None, Some(33), (33, 33))]
fn test_output_dimensions(
    #[case] width: Option<u32>,
    #[case] height: Option<u32>,
    #[case] quality: Option<u32>,
    #[case] expected: (u32, u32),
) {
    let source = png(&checkerboard(200, 100));
    let request = TransformRequest {
        width,
        height,
        quality,
        format: RequestedFormat::Explicit(TargetFormat::Png),
        source_format: "png".to_string(),
    };

    let result = transform(&source, &request).unwrap();

    assert_eq!(dimensions(&result.bytes), expected);
    assert_eq!(result.metrics.processed_dimensions, expected);
}

#[test]
fn test_upscale_is_allowed() {
    let source = png(&checkerboard(4, 4));
    let request = TransformRequest::new("png").with_width(16).with_height(8);

    let result = transform(&source, &request).unwrap();

    assert_eq!(dimensions(&result.bytes), (16, 8));
}

#[test]
fn test_nearest_neighbor_keeps_hard_edges() {
    let source = png(&checkerboard(8, 8));
    let request = TransformRequest::new("png").with_width(16).with_height(16);

    let result = transform(&source, &request).unwrap();
    let output = image::load_from_memory(&result.bytes).unwrap().to_rgba8();

    // No interpolated grays
    for pixel in output.pixels() {
        assert!(pixel.0[0] == 0 || pixel.0[0] == 255);
    }
}

#[test]
fn test_metrics_record_steps() {
    let source = png(&checkerboard(40, 40));
    let request = TransformRequest::new("png")
        .with_width(20)
        .with_quality(50)
        .with_format(RequestedFormat::Explicit(TargetFormat::WebP));

    let result = transform(&source, &request).unwrap();

    assert_eq!(result.media_type, "image/webp");
    assert_eq!(
        result.metrics.transformations,
        vec![
            TransformationType::Resize,
            TransformationType::QualityRescale,
            TransformationType::FormatConversion,
        ]
    );
    assert_eq!(result.metrics.original_dimensions, (40, 40));
    assert_eq!(result.metrics.processed_dimensions, (10, 20));
}

#[test]
fn test_unrecognized_source_format_encodes_webp() {
    let source = png(&checkerboard(4, 4));
    let request = TransformRequest::new("x-icon").with_width(2);

    let result = transform(&source, &request).unwrap();

    assert_eq!(result.format, TargetFormat::WebP);
    assert_eq!(result.media_type, "image/webp");
}

#[test]
fn test_truncated_input_fails() {
    let mut source = png(&checkerboard(16, 16));
    source.truncate(source.len() / 2);

    let request = TransformRequest::new("png").with_width(8);

    assert!(transform(&source, &request).is_err());
}
