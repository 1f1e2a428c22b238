// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod rate_limit;
mod server;
mod storage;

pub use rate_limit::{CounterBackendConfig, RateLimitConfig};
pub use server::ServerConfig;
pub use storage::{S3StorageConfig, StorageConfig};

use crate::constants::DEFAULT_CACHE_BROWSER_SECONDS;

fn default_cache_browser_seconds() -> u64 {
    DEFAULT_CACHE_BROWSER_SECONDS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Request handling switches shared by the fetch and upload handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Require a bearer token on GET (REQUIRE_AUTH_GET)
    #[serde(default)]
    pub require_auth_get: bool,
    /// Require a bearer token on PUT /upload (REQUIRE_AUTH_PUT)
    #[serde(default)]
    pub require_auth_put: bool,
    /// Shared secret compared against the bearer token (API_TOKEN)
    #[serde(default, skip_serializing)]
    pub api_token: String,
    /// max-age of the Cache-Control header on fetches (CACHE_BROWSER_SECONDS)
    #[serde(default = "default_cache_browser_seconds")]
    pub cache_browser_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            require_auth_get: false,
            require_auth_put: false,
            api_token: String::new(),
            cache_browser_seconds: default_cache_browser_seconds(),
        }
    }
}

/// `"true"` in any case is true; everything else, including absence, is false
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_u64(name: &str, value: &str) -> Result<u64, String> {
    value.trim().parse::<u64>().map_err(|_| {
        format!(
            "Environment variable '{}' must be a non-negative integer, got '{}'",
            name, value
        )
    })
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let mut config = Self::from_yaml_with_env(&yaml)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Defaults plus the deployment environment variables
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply REQUIRE_AUTH_GET, REQUIRE_AUTH_PUT, API_TOKEN,
    /// CACHE_BROWSER_SECONDS and RATE_LIMIT from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), String> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply the environment overrides from an arbitrary lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("REQUIRE_AUTH_GET") {
            self.gateway.require_auth_get = parse_flag(&value);
        }
        if let Some(value) = lookup("REQUIRE_AUTH_PUT") {
            self.gateway.require_auth_put = parse_flag(&value);
        }
        if let Some(value) = lookup("API_TOKEN") {
            self.gateway.api_token = value;
        }
        if let Some(value) = lookup("CACHE_BROWSER_SECONDS") {
            self.gateway.cache_browser_seconds = parse_u64("CACHE_BROWSER_SECONDS", &value)?;
        }
        if let Some(value) = lookup("RATE_LIMIT") {
            self.rate_limit.threshold = parse_u64("RATE_LIMIT", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be greater than 0".to_string());
        }

        if self.server.threads == 0 {
            return Err("server.threads must be greater than 0".to_string());
        }

        if let StorageConfig::S3(s3) = &self.storage {
            if s3.bucket.trim().is_empty() {
                return Err("storage.bucket is required for the s3 backend".to_string());
            }
        }

        if let CounterBackendConfig::Redis { url } = &self.rate_limit.backend {
            if url.trim().is_empty() {
                return Err("rate_limit.backend.url is required for the redis backend".to_string());
            }
        }

        if self.rate_limit.window_seconds == 0 {
            return Err("rate_limit.window_seconds must be greater than 0".to_string());
        }

        if (self.gateway.require_auth_get || self.gateway.require_auth_put)
            && self.gateway.api_token.is_empty()
        {
            return Err(
                "API_TOKEN must be set when REQUIRE_AUTH_GET or REQUIRE_AUTH_PUT is enabled"
                    .to_string(),
            );
        }

        Ok(())
    }
}
