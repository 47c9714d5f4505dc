//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "BYOC";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub nvd: NvdConfig,
    pub osv: OsvConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Zero (the default) disables the timeout layer.
    pub request_timeout_seconds: u64,
    /// `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_seconds: 0,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// NVD CVE API 2.0 settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NvdConfig {
    pub base_url: String,
    /// Sent as the `apiKey` header, which raises the NVD rate limit.
    pub api_key: Option<String>,
    pub results_per_page: u32,
}

impl Default for NvdConfig {
    fn default() -> Self {
        Self {
            base_url: "https://services.nvd.nist.gov/rest/json/cves/2.0".to_string(),
            api_key: None,
            results_per_page: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OsvConfig {
    pub base_url: String,
    pub default_ecosystem: String,
}

impl Default for OsvConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.osv.dev/v1".to_string(),
            default_ecosystem: "npm".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 3600 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Zero disables the per-request timeout.
    pub timeout_seconds: u64,
    pub retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: crate::http::DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 30,
            retries: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json`, `pretty` or anything else for the compact formatter.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`Config::load`], with an extra file layered above `config/default`.
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }
}
