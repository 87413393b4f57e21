//! API Server Module
//!
//! This module contains the router setup and listeners for the REST and
//! JSON-RPC servers.

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use modelhub_core::ModelFacade;

use crate::handlers::{
    delete_model, get_metrics, get_model, health_check, list_models, model_classes, predict,
    retrain_model, train_model, ApiState,
};
use crate::models::ApiConfig;
use crate::rpc::rpc_endpoint;

/// Build the REST router
pub fn create_rest_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/model-classes", get(model_classes))
        // Model operations
        .route("/models/train", post(train_model))
        .route("/models", get(list_models))
        .route("/models/:id", get(get_model).delete(delete_model))
        .route("/models/:id/predict", post(predict))
        .route("/models/:id/retrain", post(retrain_model))
        .route("/metrics/:id", get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the JSON-RPC router
pub fn create_rpc_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/rpc", post(rpc_endpoint))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server
pub struct ApiServer {
    /// Server configuration
    config: ApiConfig,
    /// Shared state
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiConfig, facade: Arc<ModelFacade>) -> Self {
        let state = Arc::new(ApiState::new(facade));
        Self { config, state }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Start the REST server
    pub async fn start_rest(&self) -> Result<()> {
        let addr = self.config.rest_addr();
        info!("Starting ModelHub REST API on {addr}");

        let app = create_rest_router(self.state.clone());
        serve(&addr, app, "REST API").await
    }

    /// Start the JSON-RPC server
    pub async fn start_rpc(&self) -> Result<()> {
        let addr = self.config.rpc_addr();
        info!("Starting ModelHub JSON-RPC server on {addr}");

        let app = create_rpc_router(self.state.clone());
        serve(&addr, app, "JSON-RPC server").await
    }

    /// Start both servers and run until either stops
    pub async fn start(&self) -> Result<()> {
        tokio::try_join!(self.start_rest(), self.start_rpc())?;
        Ok(())
    }
}

async fn serve(addr: &str, app: Router, name: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {name} to {addr}: {e}"))?;
    info!("ModelHub {name} listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start {name}: {e}"))?;

    info!("ModelHub {name} stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
