//! Request router for the image gateway
//!
//! Composes the rate limiter, the bearer token check, the object store and
//! the image transformer. Each handler runs the same sequence:
//!
//! 1. Count the request against the client (429 when over the threshold)
//! 2. Check the bearer token when auth is required for the method (401)
//! 3. Do the work: fetch (+ transform) or store
//!
//! Upload bodies are only read in step 3.
//!
//! Every failure becomes a plain-text response; internal causes are logged
//! and never returned.

mod http;

pub use http::{GatewayRequest, GatewayResponse, RequestBody, Route};

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::auth;
use crate::config::{Config, CounterBackendConfig, StorageConfig};
use crate::constants::{DEFAULT_OBJECT_CONTENT_TYPE, DEFAULT_UPLOAD_CONTENT_TYPE};
use crate::error::{BadRequestReason, GatewayError};
use crate::image_optimizer::{self, source_format_from_content_type, ImageError, TransformRequest};
use crate::metrics::GatewayMetrics;
use crate::pipeline::RequestContext;
use crate::rate_limit::{
    CounterStore, MemoryCounterStore, RateLimitDecision, RateLimiter, RedisCounterStore,
};
use crate::storage::{MemoryObjectStore, ObjectStore, S3ObjectStore, StoredObject};

/// Per-method switches and limits, parsed once at startup
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub require_auth_get: bool,
    pub require_auth_put: bool,
    pub api_token: String,
    pub cache_browser_seconds: u64,
    pub max_upload_bytes: usize,
}

impl GatewaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            require_auth_get: config.gateway.require_auth_get,
            require_auth_put: config.gateway.require_auth_put,
            api_token: config.gateway.api_token.clone(),
            cache_browser_seconds: config.gateway.cache_browser_seconds,
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }

    fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_browser_seconds)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The image gateway
pub struct Gateway {
    store: Arc<dyn ObjectStore>,
    limiter: RateLimiter,
    settings: GatewaySettings,
}

impl Gateway {
    pub fn new(store: Arc<dyn ObjectStore>, limiter: RateLimiter, settings: GatewaySettings) -> Self {
        Self {
            store,
            limiter,
            settings,
        }
    }

    /// Build the stores and limiter described by the configuration
    ///
    /// Network clients (S3, Redis) are created lazily on first request.
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let store: Arc<dyn ObjectStore> = match &config.storage {
            StorageConfig::Memory => {
                tracing::warn!("Using in-memory object store; uploads are lost on restart");
                Arc::new(MemoryObjectStore::new())
            }
            StorageConfig::S3(s3) => Arc::new(S3ObjectStore::new(s3.clone())),
        };

        let counters: Arc<dyn CounterStore> = match &config.rate_limit.backend {
            CounterBackendConfig::Memory { max_entries } => {
                Arc::new(MemoryCounterStore::with_capacity(*max_entries))
            }
            CounterBackendConfig::Redis { url } => {
                Arc::new(RedisCounterStore::new(url).map_err(|e| e.to_string())?)
            }
        };

        let limiter = RateLimiter::new(counters, config.rate_limit.threshold)
            .with_window(Duration::from_secs(config.rate_limit.window_seconds))
            .with_key_prefix(config.rate_limit.key_prefix.clone());

        Ok(Self::new(store, limiter, GatewaySettings::from_config(config)))
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Serve one request whose body, if any, is already buffered
    pub async fn handle(&self, ctx: &RequestContext, mut request: GatewayRequest) -> GatewayResponse {
        let mut body = request.body.take();
        self.handle_with_body(ctx, request, &mut body).await
    }

    /// Serve one request, pulling the upload body from `body` once admitted
    ///
    /// Never fails; errors become responses.
    pub async fn handle_with_body(
        &self,
        ctx: &RequestContext,
        request: GatewayRequest,
        body: &mut dyn RequestBody,
    ) -> GatewayResponse {
        let method = request.method.clone();

        let result = match request.route() {
            Route::Upload => self.upload_from(ctx, &request, body).await,
            Route::Fetch => self.fetch(ctx, &request).await,
            Route::NotAllowed => Err(GatewayError::MethodNotAllowed {
                method: method.clone(),
            }),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                log_failure(ctx, &err);
                GatewayResponse::from(&err)
            }
        };

        GatewayMetrics::global().record_response(&method, response.status, response.body.len());

        tracing::info!(
            request_id = %ctx.request_id(),
            method = %method,
            path = %ctx.path(),
            status = response.status,
            bytes = response.body.len(),
            duration_ms = ctx.elapsed().as_millis() as u64,
            "Request completed"
        );

        response
    }

    /// GET: return the stored object, transformed when the query asks for it
    pub async fn fetch(
        &self,
        ctx: &RequestContext,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        self.admit(request.client_id.as_deref()).await?;
        self.authorize(self.settings.require_auth_get, request)?;

        let key = request.object_key().ok_or_else(|| GatewayError::NotFound {
            key: String::new(),
        })?;

        let object = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| GatewayError::NotFound { key: key.clone() })?;

        let content_type = object
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OBJECT_CONTENT_TYPE.to_string());

        let transform =
            TransformRequest::from_query(&request.query, source_format_from_content_type(&content_type));

        let (body, media_type) = if transform.is_identity() {
            (object.body, content_type)
        } else {
            let (bytes, media_type) = self.transform(ctx, &key, object.body, transform).await?;
            (bytes, media_type.to_string())
        };

        Ok(GatewayResponse::new(200, body)
            .with_header("Content-Type", media_type)
            .with_header("Cache-Control", self.settings.cache_control()))
    }

    /// PUT /upload?filename=<name>: store the buffered body under the filename
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        mut request: GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut body = request.body.take();
        self.upload_from(ctx, &request, &mut body).await
    }

    /// Upload with a body that is read only after the rate limit and token check
    pub async fn upload_from(
        &self,
        ctx: &RequestContext,
        request: &GatewayRequest,
        body: &mut dyn RequestBody,
    ) -> Result<GatewayResponse, GatewayError> {
        self.admit(request.client_id.as_deref()).await?;
        self.authorize(self.settings.require_auth_put, request)?;

        let body = body
            .read_body(self.settings.max_upload_bytes)
            .await?
            .filter(|body| !body.is_empty())
            .ok_or(GatewayError::BadRequest(BadRequestReason::MissingBody))?;

        let filename = request
            .query
            .get("filename")
            .filter(|name| !name.is_empty())
            .cloned()
            .ok_or(GatewayError::BadRequest(BadRequestReason::MissingFilename))?;

        if body.len() > self.settings.max_upload_bytes {
            return Err(GatewayError::PayloadTooLarge {
                size: body.len(),
                limit: self.settings.max_upload_bytes,
            });
        }

        let content_type = request
            .header("Content-Type")
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(DEFAULT_UPLOAD_CONTENT_TYPE)
            .to_string();

        let size = body.len();
        self.store
            .put(&filename, StoredObject::new(body, Some(content_type.clone())))
            .await?;

        GatewayMetrics::global().uploaded_bytes.inc_by(size as u64);
        tracing::info!(
            request_id = %ctx.request_id(),
            filename = %filename,
            content_type = %content_type,
            size = size,
            "Stored upload"
        );

        Ok(GatewayResponse::text(
            200,
            format!("File {} uploaded successfully", filename),
        ))
    }

    async fn admit(&self, client_id: Option<&str>) -> Result<(), GatewayError> {
        match self.limiter.check(client_id).await? {
            RateLimitDecision::Reject { .. } => {
                GatewayMetrics::global().rate_limited.inc();
                Err(GatewayError::RateLimited {
                    client_id: client_id.unwrap_or_default().to_string(),
                })
            }
            RateLimitDecision::Unidentified => {
                GatewayMetrics::global().rate_limit_unidentified.inc();
                tracing::debug!("No client identifier, skipping rate limit");
                Ok(())
            }
            RateLimitDecision::Admit { .. } => Ok(()),
        }
    }

    fn authorize(&self, required: bool, request: &GatewayRequest) -> Result<(), GatewayError> {
        if required && !auth::authenticate(&request.headers, &self.settings.api_token) {
            return Err(GatewayError::Unauthorized);
        }
        Ok(())
    }

    /// Run the CPU-bound pipeline off the async workers
    ///
    /// If this future is dropped (client aborted), the pipeline stops at its
    /// next step boundary and releases its raster.
    async fn transform(
        &self,
        ctx: &RequestContext,
        key: &str,
        source: Bytes,
        transform: TransformRequest,
    ) -> Result<(Bytes, &'static str), GatewayError> {
        let cancel = CancelOnDrop::new();
        let cancelled = cancel.flag();
        let joined = tokio::task::spawn_blocking(move || {
            image_optimizer::transform_cancellable(&source, &transform, &cancelled)
        })
        .await;
        drop(cancel);

        let result = match joined {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                GatewayMetrics::global().record_transform_failure(err.stage());
                return Err(log_image_error(ctx, key, err));
            }
            Err(join_err) => {
                GatewayMetrics::global().record_transform_failure("panic");
                return Err(GatewayError::from(join_err));
            }
        };

        GatewayMetrics::global().record_transform(&result.metrics);
        tracing::debug!(
            request_id = %ctx.request_id(),
            key = %key,
            format = result.format.as_str(),
            original_bytes = result.metrics.original_size,
            output_bytes = result.metrics.processed_size,
            transformations = %result.metrics.transformation_labels(),
            "Image transformed"
        );

        Ok((Bytes::from(result.bytes), result.media_type))
    }
}

/// Raises a shared flag when dropped
struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    fn flag(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn log_image_error(ctx: &RequestContext, key: &str, err: ImageError) -> GatewayError {
    tracing::debug!(
        request_id = %ctx.request_id(),
        key = %key,
        stage = err.stage(),
        "Image pipeline failed"
    );
    GatewayError::from(err)
}

fn log_failure(ctx: &RequestContext, err: &GatewayError) {
    match err {
        GatewayError::Processing(cause) => tracing::error!(
            request_id = %ctx.request_id(),
            client_id = ?ctx.client_id(),
            path = %ctx.path(),
            error = %cause,
            "Request failed"
        ),
        GatewayError::NotFound { .. } | GatewayError::MethodNotAllowed { .. } => tracing::debug!(
            request_id = %ctx.request_id(),
            path = %ctx.path(),
            kind = err.kind(),
            "{}",
            err
        ),
        _ => tracing::warn!(
            request_id = %ctx.request_id(),
            client_id = ?ctx.client_id(),
            path = %ctx.path(),
            kind = err.kind(),
            "{}",
            err
        ),
    }
}
