// Constants module - centralized default values for configuration
//
// Using constants instead of magic numbers keeps the defaults of the
// gateway, the limiter and the transformer in one place.

// =============================================================================
// Server defaults
// =============================================================================

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

/// Default maximum upload body size (10 MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// =============================================================================
// Gateway defaults
// =============================================================================

/// Default browser cache lifetime for served images (one year)
pub const DEFAULT_CACHE_BROWSER_SECONDS: u64 = 31_536_000;

/// Content type assumed for stored objects without metadata
pub const DEFAULT_OBJECT_CONTENT_TYPE: &str = "image/jpeg";

/// Content type stored for uploads without a Content-Type header
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// Path that accepts PUT uploads
pub const UPLOAD_PATH: &str = "/upload";

// =============================================================================
// Rate limit defaults
// =============================================================================

/// Default number of requests tolerated per window before rejecting
pub const DEFAULT_RATE_LIMIT: u64 = 500;

/// Default counter lifetime in seconds
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Prefix of every counter key
pub const DEFAULT_RATE_LIMIT_KEY_PREFIX: &str = "ratelimit:";

/// Header carrying the client address when running behind an edge
pub const DEFAULT_CLIENT_IP_HEADER: &str = "cf-connecting-ip";

/// Upper bound of live counters kept by the in-memory counter store
pub const DEFAULT_MEMORY_COUNTER_CAPACITY: u64 = 100_000;

// =============================================================================
// Image defaults
// =============================================================================

/// JPEG output quality (most aggressive compression the encoder offers)
pub const JPEG_OUTPUT_QUALITY: u8 = 1;

/// WebP output quality (libwebp default)
pub const WEBP_OUTPUT_QUALITY: f32 = 75.0;

/// Largest raster the transformer will allocate (100 megapixels)
pub const MAX_OUTPUT_PIXELS: u64 = 100_000_000;
