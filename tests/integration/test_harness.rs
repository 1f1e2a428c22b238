// Test utilities: gateways over in-memory stores, a counter store with a
// manually advanced clock, and small image fixtures

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use imgate::error::GatewayError;
use imgate::gateway::{Gateway, GatewayRequest, GatewayResponse, GatewaySettings, RequestBody};
use imgate::pipeline::RequestContext;
use imgate::rate_limit::{CounterStore, CounterStoreError, MemoryCounterStore, RateLimiter};
use imgate::storage::{MemoryObjectStore, ObjectStore, StorageError, StoredObject};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counter store whose clock only moves when the test says so
#[derive(Default)]
pub struct ManualClockStore {
    now: Mutex<Duration>,
    entries: Mutex<HashMap<String, (String, Duration)>>,
}

impl ManualClockStore {
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        let now = *self.now.lock();
        self.entries
            .lock()
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone())
    }
}

#[async_trait]
impl CounterStore for ManualClockStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CounterStoreError> {
        Ok(self.raw(key))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CounterStoreError> {
        let expires_at = *self.now.lock() + ttl;
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }
}

/// Counter store that is always down
pub struct UnavailableCounterStore;

#[async_trait]
impl CounterStore for UnavailableCounterStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CounterStoreError> {
        Err(CounterStoreError::Connection("connection refused".to_string()))
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CounterStoreError> {
        Err(CounterStoreError::Connection("connection refused".to_string()))
    }
}

/// Object store wrapper counting lookups
#[derive(Default)]
pub struct CountingObjectStore {
    inner: MemoryObjectStore,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl CountingObjectStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for CountingObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, object: StoredObject) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, object).await
    }
}

/// Body source that records whether the gateway ever pulled it
pub struct TrackedBody {
    body: Option<Bytes>,
    pub reads: usize,
    pub last_limit: Option<usize>,
}

impl TrackedBody {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: Some(body.into()),
            reads: 0,
            last_limit: None,
        }
    }
}

#[async_trait]
impl RequestBody for TrackedBody {
    async fn read_body(&mut self, limit: usize) -> Result<Option<Bytes>, GatewayError> {
        self.reads += 1;
        self.last_limit = Some(limit);
        Ok(self.body.take())
    }
}

pub struct TestGateway {
    pub gateway: Gateway,
    pub store: Arc<CountingObjectStore>,
}

impl TestGateway {
    pub fn new(settings: GatewaySettings) -> Self {
        let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::new()), 500);
        Self::with_limiter(settings, limiter)
    }

    pub fn with_limiter(settings: GatewaySettings, limiter: RateLimiter) -> Self {
        let store = Arc::new(CountingObjectStore::default());
        let gateway = Gateway::new(store.clone(), limiter, settings);
        Self { gateway, store }
    }

    pub async fn send(&self, request: GatewayRequest) -> GatewayResponse {
        let ctx = RequestContext::new(request.method.clone(), request.path.clone());
        self.gateway.handle(&ctx, request).await
    }

    pub async fn send_with_body(
        &self,
        request: GatewayRequest,
        body: &mut TrackedBody,
    ) -> GatewayResponse {
        let ctx = RequestContext::new(request.method.clone(), request.path.clone());
        self.gateway.handle_with_body(&ctx, request, body).await
    }

    pub async fn seed(&self, key: &str, body: Vec<u8>, content_type: Option<&str>) {
        self.store
            .inner
            .put(key, StoredObject::new(body, content_type.map(str::to_string)))
            .await
            .unwrap();
    }
}

pub fn settings() -> GatewaySettings {
    GatewaySettings::default()
}

/// Image with a distinct color per pixel so nearest-neighbor output is checkable
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    DynamicImage::ImageRgba8(img)
}

pub fn encode(img: &DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageOutputFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(gradient(width, height).to_rgb8()),
        ImageOutputFormat::Jpeg(90),
    )
}

pub fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}
