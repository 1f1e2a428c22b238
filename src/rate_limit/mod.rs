//! Rate Limiting with a Short-Lived Request Counter
//!
//! Each client identifier owns one counter in an external key/value store.
//! The counter expires a fixed window (60 s by default) after its last
//! write, so a client that goes quiet starts again from zero.
//!
//! ## Decision rule
//!
//! The count read *before* this request is compared with the threshold:
//! - `observed > threshold` → reject with 429
//! - otherwise → admit
//!
//! This admits `threshold + 1` requests per window. Rejected requests still
//! bump the counter, so a client that keeps hammering never recovers until
//! it backs off for a full window.
//!
//! ## Counter writes
//!
//! Every identified request writes `observed + 1` once before the decision,
//! and admitted requests write the same value a second time afterwards. The
//! second write refreshes the TTL without raising the count. Both writes live
//! in [`RateLimiter::record_and_check`].
//!
//! ## Consistency
//!
//! Read and write are separate round trips with no locking. Concurrent
//! requests from one client can under-count; the limiter is best-effort.
//!
//! ## Configuration Example
//!
//! ```yaml
//! rate_limit:
//!   threshold: 500
//!   window_seconds: 60
//!   backend:
//!     type: redis
//!     url: redis://127.0.0.1:6379
//! ```

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_RATE_LIMIT, DEFAULT_RATE_LIMIT_KEY_PREFIX, DEFAULT_RATE_LIMIT_WINDOW_SECS,
};

pub use self::memory::MemoryCounterStore;
pub use self::redis::RedisCounterStore;

/// Errors raised by a counter store backend
#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("counter store connection failed: {0}")]
    Connection(String),

    #[error("counter store operation failed: {0}")]
    Operation(String),
}

/// Key/value store holding one string counter per key, with expiry
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current value, or None if the key is absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CounterStoreError>;

    /// Overwrite the value and reset its time-to-live
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CounterStoreError>;
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// No client identifier: nothing to count against, request proceeds
    Unidentified,
    /// Request may proceed; `observed` is the count before this request
    Admit { observed: u64 },
    /// Request must be answered with 429
    Reject { observed: u64 },
}

impl RateLimitDecision {
    pub fn is_rejected(&self) -> bool {
        matches!(self, RateLimitDecision::Reject { .. })
    }
}

/// Per-client request limiter over an injected counter store
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    threshold: u64,
    window: Duration,
    key_prefix: String,
}

impl RateLimiter {
    /// Create a limiter with the default window and key prefix
    pub fn new(store: Arc<dyn CounterStore>, threshold: u64) -> Self {
        Self {
            store,
            threshold,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            key_prefix: DEFAULT_RATE_LIMIT_KEY_PREFIX.to_string(),
        }
    }

    /// Create a limiter with the default threshold of 500
    pub fn with_default_threshold(store: Arc<dyn CounterStore>) -> Self {
        Self::new(store, DEFAULT_RATE_LIMIT)
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Counter key for a client identifier
    pub fn counter_key(&self, client_id: &str) -> String {
        format!("{}{}", self.key_prefix, client_id)
    }

    /// Count this request against the client and decide
    ///
    /// A missing or blank identifier is never limited and touches no counter.
    /// Store failures propagate; no retry is attempted.
    pub async fn check(
        &self,
        client_id: Option<&str>,
    ) -> Result<RateLimitDecision, CounterStoreError> {
        let client_id = match client_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => return Ok(RateLimitDecision::Unidentified),
        };

        let key = self.counter_key(client_id);
        let decision = self.record_and_check(&key).await?;

        if let RateLimitDecision::Reject { observed } = decision {
            tracing::warn!(
                client_id = %client_id,
                observed = observed,
                threshold = self.threshold,
                "Rate limit exceeded"
            );
        }

        Ok(decision)
    }

    /// Read the counter, write it back incremented, decide, and on admit
    /// write the same incremented value again
    async fn record_and_check(&self, key: &str) -> Result<RateLimitDecision, CounterStoreError> {
        let observed = self.read_count(key).await?;
        let next = observed.saturating_add(1).to_string();

        self.store.put(key, &next, self.window).await?;

        if observed > self.threshold {
            return Ok(RateLimitDecision::Reject { observed });
        }

        self.store.put(key, &next, self.window).await?;
        Ok(RateLimitDecision::Admit { observed })
    }

    async fn read_count(&self, key: &str) -> Result<u64, CounterStoreError> {
        let raw = self.store.get(key).await?;

        Ok(match raw {
            Some(value) => value.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(key = %key, value = %value, "Unparseable rate limit counter, treating as 0");
                0
            }),
            None => 0,
        })
    }
}
