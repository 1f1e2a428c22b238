//! Rate limiting configuration types.
//!
//! Counters live either in process memory (single instance) or in Redis
//! (shared between instances).

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CLIENT_IP_HEADER, DEFAULT_MEMORY_COUNTER_CAPACITY, DEFAULT_RATE_LIMIT,
    DEFAULT_RATE_LIMIT_KEY_PREFIX, DEFAULT_RATE_LIMIT_WINDOW_SECS,
};

fn default_threshold() -> u64 {
    DEFAULT_RATE_LIMIT
}

fn default_window_seconds() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW_SECS
}

fn default_key_prefix() -> String {
    DEFAULT_RATE_LIMIT_KEY_PREFIX.to_string()
}

fn default_client_ip_header() -> String {
    DEFAULT_CLIENT_IP_HEADER.to_string()
}

fn default_max_entries() -> u64 {
    DEFAULT_MEMORY_COUNTER_CAPACITY
}

/// Where rate limit counters are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CounterBackendConfig {
    Memory {
        #[serde(default = "default_max_entries")]
        max_entries: u64,
    },
    Redis {
        #[serde(default)]
        url: String,
    },
}

impl Default for CounterBackendConfig {
    fn default() -> Self {
        CounterBackendConfig::Memory {
            max_entries: default_max_entries(),
        }
    }
}

/// Per-client request limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests tolerated per window before rejecting (RATE_LIMIT)
    #[serde(default = "default_threshold")]
    pub threshold: u64,
    /// Counter lifetime after its last write
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Header trusted to carry the client address
    #[serde(default = "default_client_ip_header")]
    pub client_ip_header: String,
    #[serde(default)]
    pub backend: CounterBackendConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            window_seconds: default_window_seconds(),
            key_prefix: default_key_prefix(),
            client_ip_header: default_client_ip_header(),
            backend: CounterBackendConfig::default(),
        }
    }
}
