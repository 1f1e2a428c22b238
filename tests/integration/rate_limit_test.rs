// Integration tests for per-client rate limiting through the gateway

use imgate::gateway::{GatewayRequest, GatewaySettings};
use imgate::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

use super::test_harness::{
    png_bytes, settings, ManualClockStore, TestGateway, UnavailableCounterStore,
};

fn limited(threshold: u64) -> (TestGateway, Arc<ManualClockStore>) {
    limited_with(threshold, settings())
}

fn limited_with(threshold: u64, settings: GatewaySettings) -> (TestGateway, Arc<ManualClockStore>) {
    let counters = Arc::new(ManualClockStore::default());
    let limiter = RateLimiter::new(counters.clone(), threshold).with_window(Duration::from_secs(60));
    (TestGateway::with_limiter(settings, limiter), counters)
}

fn get_from(client: &str) -> GatewayRequest {
    GatewayRequest::new("GET", "/a.png").with_client_id(client)
}

#[tokio::test]
async fn test_threshold_one_admits_two_then_rejects() {
    let (gw, counters) = limited(1);
    gw.seed("a.png", png_bytes(2, 2), Some("image/png")).await;

    let mut statuses = Vec::new();
    for _ in 0..4 {
        statuses.push(gw.send(get_from("A")).await.status);
    }

    assert_eq!(statuses, vec![200, 200, 429, 429]);
    // Rejected requests keep incrementing
    assert_eq!(counters.raw("ratelimit:A"), Some("4".to_string()));
}

#[tokio::test]
async fn test_threshold_two_admits_three() {
    let (gw, _) = limited(2);
    gw.seed("a.png", png_bytes(2, 2), Some("image/png")).await;

    let mut statuses = Vec::new();
    for _ in 0..5 {
        statuses.push(gw.send(get_from("10.0.0.1")).await.status);
    }

    assert_eq!(statuses, vec![200, 200, 200, 429, 429]);
}

#[tokio::test]
async fn test_rejection_body() {
    let (gw, _) = limited(0);

    gw.send(get_from("A")).await;
    let response = gw.send(get_from("A")).await;

    assert_eq!(response.status, 429);
    assert_eq!(response.body.as_ref(), b"Rate limit exceeded");
}

#[tokio::test]
async fn test_window_resets_after_inactivity() {
    let (gw, counters) = limited(0);
    gw.seed("a.png", png_bytes(2, 2), Some("image/png")).await;

    assert_eq!(gw.send(get_from("A")).await.status, 200);
    assert_eq!(gw.send(get_from("A")).await.status, 429);

    counters.advance(Duration::from_secs(61));

    assert_eq!(gw.send(get_from("A")).await.status, 200);
    assert_eq!(counters.raw("ratelimit:A"), Some("1".to_string()));
}

#[tokio::test]
async fn test_activity_inside_window_keeps_counter_alive() {
    let (gw, counters) = limited(0);

    gw.send(get_from("A")).await;
    for _ in 0..3 {
        counters.advance(Duration::from_secs(45));
        assert_eq!(gw.send(get_from("A")).await.status, 429);
    }
}

#[tokio::test]
async fn test_missing_client_is_never_limited() {
    let (gw, counters) = limited(0);
    gw.seed("a.png", png_bytes(2, 2), Some("image/png")).await;

    for _ in 0..5 {
        let response = gw.send(GatewayRequest::new("GET", "/a.png")).await;
        assert_eq!(response.status, 200);
    }
    assert_eq!(counters.raw("ratelimit:"), None);
}

#[tokio::test]
async fn test_uploads_share_the_client_budget() {
    let (gw, _) = limited(1);

    gw.send(get_from("A")).await;
    gw.send(get_from("A")).await;
    let response = gw
        .send(
            GatewayRequest::new("PUT", "/upload")
                .with_query("filename", "a.png")
                .with_client_id("A")
                .with_body(vec![1u8]),
        )
        .await;

    assert_eq!(response.status, 429);
    assert_eq!(gw.store.puts(), 0);
}

#[tokio::test]
async fn test_rate_limit_runs_before_auth() {
    let (gw, _) = limited_with(
        0,
        GatewaySettings {
            require_auth_get: true,
            api_token: "t".to_string(),
            ..settings()
        },
    );

    assert_eq!(gw.send(get_from("A")).await.status, 401);
    assert_eq!(gw.send(get_from("A")).await.status, 429);
}

#[tokio::test]
async fn test_method_not_allowed_skips_limiter() {
    let (gw, counters) = limited(0);

    gw.send(GatewayRequest::new("POST", "/a.png").with_client_id("A"))
        .await;

    assert_eq!(counters.raw("ratelimit:A"), None);
}

#[tokio::test]
async fn test_counter_store_failure_is_500() {
    let limiter = RateLimiter::new(Arc::new(UnavailableCounterStore), 500);
    let gw = TestGateway::with_limiter(settings(), limiter);

    let response = gw.send(get_from("A")).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body.as_ref(), b"Error processing image");
    assert_eq!(gw.store.gets(), 0);
}

#[tokio::test]
async fn test_counter_store_failure_ignored_without_client() {
    let limiter = RateLimiter::new(Arc::new(UnavailableCounterStore), 500);
    let gw = TestGateway::with_limiter(settings(), limiter);

    let response = gw.send(GatewayRequest::new("GET", "/missing.png")).await;

    assert_eq!(response.status, 404);
}
