//! Server configuration types.
//!
//! This module defines the listener and process-level settings:
//! - Address and port bindings
//! - Worker thread count
//! - Upload body size limit
//! - Log output format and the optional metrics listener
//!
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ADDRESS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT, DEFAULT_THREADS};
use crate::logging::LogFormat;

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Default worker thread count
fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of worker threads (default: 4)
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Largest accepted upload body in bytes (default: 10 MB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus listener, e.g. "0.0.0.0:9090"; disabled when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            threads: default_threads(),
            max_upload_bytes: default_max_upload_bytes(),
            log_format: LogFormat::default(),
            metrics_address: None,
        }
    }
}

impl ServerConfig {
    /// "address:port" for the listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
