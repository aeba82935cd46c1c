//! dispatchd — campaign dispatch service.
//!
//! Main entry point that wires the store, engine, and API server together.

use clap::Parser;
use dispatch_api::ApiServer;
use dispatch_core::config::AppConfig;
use dispatch_engine::{CampaignDispatchEngine, SimulatedTransport};
use dispatch_store::{EntityStore, MemoryStore};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dispatchd")]
#[command(about = "Campaign dispatch service")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "DISPATCHD__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "DISPATCHD__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "DISPATCHD__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Seed demo campaigns/contacts into the in-memory store
    #[arg(long, default_value_t = false)]
    seed_demo_data: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispatchd=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("dispatchd starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        "Configuration loaded"
    );

    let memory_store = MemoryStore::new();
    if cli.seed_demo_data {
        memory_store.seed_demo_data(config.quota.daily_limit);
    }
    let store: Arc<dyn EntityStore> = Arc::new(memory_store);

    let transport = Arc::new(SimulatedTransport::new());
    let engine = Arc::new(CampaignDispatchEngine::new(store.clone(), transport));

    let api_server = ApiServer::new(config, engine, store);

    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("dispatchd is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
