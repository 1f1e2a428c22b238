// Redis counter store
//
// Shares rate limit counters between gateway instances. Expiry is delegated
// to Redis via SET ... EX.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{CounterStore, CounterStoreError};

/// Redis-backed [`CounterStore`]
///
/// The connection is established on first use, inside the runtime that
/// serves requests, and then multiplexed by `ConnectionManager`, which
/// also handles reconnection.
pub struct RedisCounterStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisCounterStore {
    /// Validate the URL; no connection is made yet
    pub fn new(redis_url: &str) -> Result<Self, CounterStoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| CounterStoreError::Connection(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CounterStoreError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                tracing::info!("Connecting to Redis counter store");
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| {
                        CounterStoreError::Connection(format!("Failed to connect to Redis: {}", e))
                    })
            })
            .await?;

        Ok(connection.clone())
    }
}

/// Redis expiry granularity is one second; never send 0, which Redis rejects
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CounterStoreError> {
        let mut conn = self.connection().await?;

        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| CounterStoreError::Operation(format!("GET {}: {}", key, e)))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CounterStoreError> {
        let mut conn = self.connection().await?;

        conn.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl))
            .await
            .map_err(|e| CounterStoreError::Operation(format!("SET {}: {}", key, e)))
    }
}

// Verify Send + Sync bounds (required for async trait)
fn _assert_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<RedisCounterStore>();
    assert_sync::<RedisCounterStore>();
}
