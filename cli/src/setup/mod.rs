use anyhow::{Context, Result};
use byoc_core::{init_tracing, Config, CveService};
use std::path::Path;

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load_from(path).with_context(|| match path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load configuration".to_string(),
    })
}

/// Installs the subscriber, falling back to `level` when the config keeps the default.
pub fn init_logging(config: &Config, level: Option<&str>) -> Result<()> {
    let mut logging = config.logging.clone();
    if let Some(level) = level {
        logging.level = level.to_string();
    }
    init_tracing(&logging).context("Failed to initialize logging")
}

pub fn build_service(config: &Config) -> Result<CveService> {
    CveService::from_config(config).context("Failed to build CVE service")
}
