//! # Ostium
//!
//! Open Service Broker fronting a paginated graph-query backend.
//!
//! The binary loads configuration, initializes tracing, builds the
//! outbound transport and broker, and serves the OSB surface over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ostium_config::{Config, ConfigLoad, ConfigLoader};
use ostium_core::graph::HttpTransport;
use ostium_core::{Broker, BrokerSettings};
use ostium_server::{AppState, create_router};

#[derive(Parser, Debug)]
#[command(name = "ostium-server")]
#[command(about = "Open Service Broker fronting a paginated graph-query backend")]
struct Cli {
    /// Path to the TOML config file (takes precedence over OSTIUM_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address as host:port (overrides the configured server address)
    #[arg(short, long, env = "OSTIUM_LISTEN")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(listen) = &cli.listen {
        apply_listen_override(&mut config, listen)?;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "loaded config file");
    }
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    let transport = HttpTransport::new(config.registry.url.clone(), config.registry.timeout)
        .context("failed to build the registry transport")?;
    let broker = Broker::new(
        Arc::new(transport),
        BrokerSettings {
            spec_base_url: config.broker.spec_base_url.clone(),
            page_size: config.registry.page_size,
            parallelism: config.registry.parallelism,
        },
    );

    let state = AppState {
        broker,
        shutdown: CancellationToken::new(),
    };
    let router = create_router(state);

    let addr = config.server.bind_address();
    info!(registry = %config.registry.url, "starting Ostium broker on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn apply_listen_override(config: &mut Config, listen: &str) -> anyhow::Result<()> {
    let (host, port) = listen
        .rsplit_once(':')
        .context("listen address must be host:port")?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid listen port {port:?}"))?;
    config.server.host = host.to_owned();
    config.server.port = port;
    Ok(())
}
