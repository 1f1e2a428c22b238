//! In-process counter store backed by moka
//!
//! Suitable for a single gateway instance. Each entry carries its own TTL,
//! which is reset on every write.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use super::{CounterStore, CounterStoreError};
use crate::constants::DEFAULT_MEMORY_COUNTER_CAPACITY;

#[derive(Debug, Clone)]
struct CounterEntry {
    value: String,
    ttl: Duration,
}

/// Expires each entry `ttl` after its most recent write
struct WriteTtl;

impl Expiry<String, CounterEntry> for WriteTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CounterEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CounterEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// moka-backed [`CounterStore`]
pub struct MemoryCounterStore {
    cache: Cache<String, CounterEntry>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_COUNTER_CAPACITY)
    }

    /// Bound the number of live counters; least recently used are evicted first
    pub fn with_capacity(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(WriteTtl)
            .build();

        Self { cache }
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CounterStoreError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CounterStoreError> {
        self.cache
            .insert(
                key.to_string(),
                CounterEntry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }
}
