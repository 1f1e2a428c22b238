//! Object storage configuration types.

use serde::{Deserialize, Serialize};

fn default_region() -> String {
    "us-east-1".to_string()
}

/// S3 bucket settings; credentials come from the AWS provider chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3StorageConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for R2, MinIO or LocalStack
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

/// Which object store backs the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    S3(S3StorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}
