// Integration tests for GET: lookup, pass-through and transforms

use imgate::gateway::{GatewayRequest, GatewaySettings};
use imgate::storage::ObjectStore;
use rstest::rstest;

use super::test_harness::{
    decoded_dimensions, gradient, jpeg_bytes, png_bytes, settings, TestGateway,
};

#[tokio::test]
async fn test_missing_object_is_404() {
    let gw = TestGateway::new(settings());

    let response = gw.send(GatewayRequest::new("GET", "/nope.png")).await;

    assert_eq!(response.status, 404);
    assert_eq!(response.body.as_ref(), b"Resource not found");
}

#[tokio::test]
async fn test_untransformed_fetch_returns_stored_bytes() {
    let gw = TestGateway::new(settings());
    let original = png_bytes(8, 4);
    gw.seed("img/a.png", original.clone(), Some("image/png")).await;

    let response = gw.send(GatewayRequest::new("GET", "/img/a.png")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_ref(), original.as_slice());
    assert_eq!(response.header("Content-Type"), Some("image/png"));
    assert_eq!(
        response.header("Cache-Control"),
        Some("public, max-age=31536000")
    );
}

#[tokio::test]
async fn test_f_auto_is_pass_through() {
    let gw = TestGateway::new(settings());
    let original = png_bytes(8, 4);
    gw.seed("a.png", original.clone(), Some("image/png")).await;

    let response = gw
        .send(GatewayRequest::new("GET", "/a.png").with_query("f", "AUTO"))
        .await;

    assert_eq!(response.body.as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_missing_content_type_defaults_to_jpeg() {
    let gw = TestGateway::new(settings());
    gw.seed("photo", jpeg_bytes(4, 4), None).await;

    let response = gw.send(GatewayRequest::new("GET", "/photo")).await;

    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
}

#[tokio::test]
async fn test_cache_seconds_from_settings() {
    let gw = TestGateway::new(GatewaySettings {
        cache_browser_seconds: 120,
        ..settings()
    });
    gw.seed("a.png", png_bytes(2, 2), Some("image/png")).await;

    let response = gw.send(GatewayRequest::new("GET", "/a.png")).await;

    assert_eq!(response.header("Cache-Control"), Some("public, max-age=120"));
}

#[tokio::test]
async fn test_percent_encoded_path_matches_decoded_key() {
    let gw = TestGateway::new(settings());
    gw.seed("my cat.png", png_bytes(2, 2), Some("image/png")).await;

    let response = gw.send(GatewayRequest::new("GET", "/my%20cat.png")).await;

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_width_only_keeps_height() {
    let gw = TestGateway::new(settings());
    gw.seed("a.png", png_bytes(200, 100), Some("image/png")).await;

    let response = gw
        .send(GatewayRequest::new("GET", "/a.png").with_query("w", "50"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/png"));
    assert_eq!(decoded_dimensions(&response.body), (50, 100));
}

#[tokio::test]
async fn test_quality_rescales_both_axes() {
    let gw = TestGateway::new(settings());
    gw.seed("a.png", png_bytes(200, 100), Some("image/png")).await;

    let response = gw
        .send(GatewayRequest::new("GET", "/a.png").with_query("q", "50"))
        .await;

    assert_eq!(decoded_dimensions(&response.body), (100, 50));
}

#[tokio::test]
async fn test_resize_then_quality() {
    let gw = TestGateway::new(settings());
    gw.seed("a.png", png_bytes(64, 64), Some("image/png")).await;

    let response = gw
        .send(
            GatewayRequest::new("GET", "/a.png")
                .with_query("w", "40")
                .with_query("h", "20")
                .with_query("q", "25"),
        )
        .await;

    assert_eq!(decoded_dimensions(&response.body), (10, 5));
}

#[rstest]
#[case("webp", "image/webp")]
#[case("WEBP", "image/webp")]
#[case("png", "image/png")]
#[case("jpeg", "image/jpeg")]
#[case("jpg", "image/jpeg")]
#[case("gif", "image/webp")]
#[case("bogus", "image/webp")]
#[tokio::test]
async fn test_format_resolution(#[case] format: &str, #[case] media_type: &str) {
    let gw = TestGateway::new(settings());
    gw.seed("a.png", png_bytes(16, 16), Some("image/png")).await;

    let response = gw
        .send(GatewayRequest::new("GET", "/a.png").with_query("f", format))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some(media_type));
}

#[tokio::test]
async fn test_webp_output_is_riff_webp() {
    let gw = TestGateway::new(settings());
    gw.seed("a.jpg", jpeg_bytes(16, 16), Some("image/jpeg")).await;

    let response = gw
        .send(GatewayRequest::new("GET", "/a.jpg").with_query("f", "webp"))
        .await;

    assert_eq!(&response.body[0..4], b"RIFF");
    assert_eq!(&response.body[8..12], b"WEBP");
}

#[tokio::test]
async fn test_auto_with_resize_keeps_source_format() {
    let gw = TestGateway::new(settings());
    gw.seed("a.jpg", jpeg_bytes(32, 32), Some("image/jpeg")).await;

    let response = gw
        .send(GatewayRequest::new("GET", "/a.jpg").with_query("w", "16"))
        .await;

    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(&response.body[0..2], &[0xFF, 0xD8]);
    assert_eq!(decoded_dimensions(&response.body), (16, 32));
}

#[tokio::test]
async fn test_png_re_encode_is_pixel_identical() {
    let gw = TestGateway::new(settings());
    let original = gradient(12, 7);
    gw.seed(
        "a.png",
        super::test_harness::encode(&original, image::ImageOutputFormat::Png),
        Some("image/png"),
    )
    .await;

    let response = gw
        .send(GatewayRequest::new("GET", "/a.png").with_query("f", "png"))
        .await;

    let decoded = image::load_from_memory(&response.body).unwrap();
    assert_eq!(decoded.to_rgba8(), original.to_rgba8());
}

#[rstest]
#[case("w", "abc")]
#[case("w", "-5")]
#[case("h", "0")]
#[case("q", "100")]
#[case("q", "0")]
#[case("q", "1.5")]
#[tokio::test]
async fn test_invalid_parameters_are_ignored(#[case] name: &str, #[case] value: &str) {
    let gw = TestGateway::new(settings());
    let original = png_bytes(10, 10);
    gw.seed("a.png", original.clone(), Some("image/png")).await;

    let response = gw
        .send(GatewayRequest::new("GET", "/a.png").with_query(name, value))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_undecodable_object_is_500_when_transforming() {
    let gw = TestGateway::new(settings());
    gw.seed("broken.png", b"not an image".to_vec(), Some("image/png"))
        .await;

    let response = gw
        .send(GatewayRequest::new("GET", "/broken.png").with_query("w", "10"))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body.as_ref(), b"Error processing image");
    assert_eq!(response.header("Content-Type"), Some("text/plain"));
}

#[tokio::test]
async fn test_undecodable_object_still_passes_through() {
    let gw = TestGateway::new(settings());
    gw.seed("notes.txt", b"hello".to_vec(), Some("text/plain"))
        .await;

    let response = gw.send(GatewayRequest::new("GET", "/notes.txt")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_ref(), b"hello");
    assert_eq!(response.header("Content-Type"), Some("text/plain"));
}

#[tokio::test]
async fn test_quality_collapsing_to_zero_is_500() {
    let gw = TestGateway::new(settings());
    gw.seed("tiny.png", png_bytes(5, 5), Some("image/png")).await;

    let response = gw
        .send(GatewayRequest::new("GET", "/tiny.png").with_query("q", "10"))
        .await;

    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn test_fetch_does_not_modify_store() {
    let gw = TestGateway::new(settings());
    let original = png_bytes(20, 20);
    gw.seed("a.png", original.clone(), Some("image/png")).await;

    gw.send(GatewayRequest::new("GET", "/a.png").with_query("w", "5"))
        .await;

    let stored = gw.store.get("a.png").await.unwrap().unwrap();
    assert_eq!(stored.body.as_ref(), original.as_slice());
}

#[rstest]
#[case("HEAD")]
#[case("POST")]
#[case("DELETE")]
#[tokio::test]
async fn test_other_methods_are_405(#[case] method: &str) {
    let gw = TestGateway::new(settings());

    let response = gw.send(GatewayRequest::new(method, "/a.png")).await;

    assert_eq!(response.status, 405);
    assert_eq!(response.body.as_ref(), b"Method Not Allowed");
    assert_eq!(gw.store.gets(), 0);
}
