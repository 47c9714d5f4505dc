use anyhow::Context;
use byoc_core::api::{create_router, serve, AppState, CveResponse};
use byoc_core::Ecosystem;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;

use super::{display, setup};

#[derive(Parser)]
pub struct Serve {
    #[arg(long, help = "Address to bind (overrides server.host)")]
    host: Option<String>,
    #[arg(short, long, help = "Port to bind (overrides server.port)")]
    port: Option<u16>,
}

impl Serve {
    pub async fn run(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        let mut config = setup::load_config(config_path)?;
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        setup::init_logging(&config, None)?;

        let service = setup::build_service(&config)?;
        tracing::info!(
            nvd = %config.nvd.base_url,
            osv = %config.osv.base_url,
            ecosystem = service.ecosystem(),
            ttl_seconds = config.cache.ttl_seconds,
            "CVE service configured"
        );

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    config.server.host, config.server.port
                )
            })?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        let router = create_router(AppState::new(service), &config.server);
        serve(listener, router).await?;
        Ok(())
    }
}

#[derive(Parser)]
pub struct Lookup {
    #[arg(help = "Search keyword, e.g. a product or package name")]
    keyword: String,
    #[arg(short, long, help = "Output in JSON format")]
    json: bool,
    #[arg(short, long, help = "Ecosystem for the package query (overrides osv.default_ecosystem)")]
    ecosystem: Option<String>,
}

impl Lookup {
    pub async fn run(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        let mut config = setup::load_config(config_path)?;
        if let Some(ecosystem) = &self.ecosystem {
            config.osv.default_ecosystem = ecosystem.clone();
        }

        setup::init_logging(&config, Some("warn"))?;
        let service = setup::build_service(&config)?;

        match service.lookup(&self.keyword).await {
            Ok(lookup) => {
                if self.json {
                    println!("{}", display::print_json(&CveResponse::from(lookup))?);
                } else {
                    display::print_report(&self.keyword, &lookup);
                }
                Ok(())
            }
            Err(e) if e.is_rate_limited() => {
                let body = CveResponse::error(byoc_core::api::models::RATE_LIMITED_MESSAGE);
                if self.json {
                    println!("{}", display::print_json(&body)?);
                } else {
                    display::print_rate_limited(&e);
                }
                Ok(())
            }
            Err(e) => Err(e).context(format!("Lookup failed for '{}'", self.keyword)),
        }
    }
}

#[derive(Parser)]
pub struct Ecosystems;

impl Ecosystems {
    pub fn run(&self) {
        println!("Supported ecosystems:");
        for ecosystem in Ecosystem::ALL {
            println!("  - {:<10} (OSV: {})", ecosystem.to_string(), ecosystem.osv_name());
        }
    }
}
