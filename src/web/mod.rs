//! Web layer module
//!
//! HTTP surface for external consumers of the store: a health check and the
//! sensor-state query endpoint. Handlers are thin and delegate to
//! `PlantMetricsStore`; an empty store is a defined "unavailable" response,
//! never an error status.

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::WebConfig;
use crate::errors::AppError;
use crate::state::PlantMetricsStore;

pub mod api;

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &WebConfig, store: PlantMetricsStore) -> Result<Self> {
        let app = Self::create_router(AppState { store });
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(AppError::AddrParse)?;
        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(api::health_check))
            .nest("/api/v1", Self::api_v1_routes())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    fn api_v1_routes() -> Router<AppState> {
        Router::new().route("/state", get(api::get_sensor_state))
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(AppError::Io)?;
        axum::serve(listener, self.app).await.map_err(AppError::Io)?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: PlantMetricsStore,
}
