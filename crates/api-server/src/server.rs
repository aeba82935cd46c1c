//! HTTP server assembly — routes, middleware, metrics exporter.

use crate::auth;
use crate::rest::{self, AppState};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use dispatch_core::config::AppConfig;
use dispatch_engine::CampaignDispatchEngine;
use dispatch_store::EntityStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    engine: Arc<CampaignDispatchEngine>,
    store: Arc<dyn EntityStore>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        engine: Arc<CampaignDispatchEngine>,
        store: Arc<dyn EntityStore>,
    ) -> Self {
        Self {
            config,
            engine,
            store,
        }
    }

    /// Build the application router. Exposed separately so tests can drive
    /// it without binding a socket.
    pub fn router(&self) -> Router {
        let state = AppState {
            engine: self.engine.clone(),
            store: self.store.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        Router::new()
            // Auth
            .route("/api/v1/auth/login", post(rest::handle_login))
            // Dispatch
            .route("/api/v1/dispatch", post(rest::handle_dispatch))
            // Campaign / contact reads for the dashboard
            .route("/api/v1/campaigns", get(rest::list_campaigns))
            .route("/api/v1/campaigns/:id", get(rest::get_campaign))
            .route("/api/v1/campaigns/:id/metrics", get(rest::campaign_metrics))
            .route("/api/v1/contacts", get(rest::list_contacts))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(middleware::from_fn(auth::auth_middleware))
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server (blocks until shutdown).
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the Prometheus exporter on its own port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
