//! API Handlers Module
//!
//! This module contains the REST request handlers and the shared state
//! both transports use to reach the model facade.

use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use modelhub_core::{ClassificationMetrics, ModelFacade};
use std::sync::Arc;
use tokio::task::JoinError;

use crate::error::Result;
use crate::models::{
    HealthResponse, ModelClassMap, ModelResponse, PredictRequest, PredictResponse,
    RetrainRequest, RetrainResponse, TrainRequest, TrainResponse,
};

/// Represents the state of the API servers
pub struct ApiState {
    /// Model lifecycle facade
    pub facade: Arc<ModelFacade>,
}

impl ApiState {
    pub fn new(facade: Arc<ModelFacade>) -> Self {
        Self { facade }
    }
}

/// Run a blocking facade call on the blocking thread pool
pub(crate) async fn run_blocking<T, F>(
    state: &ApiState,
    task: F,
) -> std::result::Result<modelhub_core::Result<T>, JoinError>
where
    F: FnOnce(&ModelFacade) -> modelhub_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let facade = state.facade.clone();
    tokio::task::spawn_blocking(move || task(&facade)).await
}

/// Health check endpoint
#[debug_handler]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// List the supported model classes
#[debug_handler]
pub async fn model_classes(State(state): State<Arc<ApiState>>) -> Json<ModelClassMap> {
    Json(ModelClassMap::from(state.facade.model_classes()))
}

/// Train a model and add it to the catalog
#[debug_handler]
pub async fn train_model(
    State(state): State<Arc<ApiState>>,
    payload: std::result::Result<Json<TrainRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TrainResponse>)> {
    let Json(request) = payload?;
    tracing::info!(
        "Received training request for {} with {} samples",
        request.model_type,
        request.features.len()
    );

    let outcome = run_blocking(&state, move |facade| {
        facade.train(
            &request.model_type,
            &request.params,
            &request.features,
            &request.y,
        )
    })
    .await??;

    Ok((
        StatusCode::CREATED,
        Json(TrainResponse {
            model_id: outcome.run_id,
            metrics: outcome.metrics,
        }),
    ))
}

/// List every cataloged model
#[debug_handler]
pub async fn list_models(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<ModelResponse>>> {
    let records = run_blocking(&state, |facade| facade.list()).await??;
    Ok(Json(records.into_iter().map(ModelResponse::from).collect()))
}

/// Get a model by ID
#[debug_handler]
pub async fn get_model(
    State(state): State<Arc<ApiState>>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelResponse>> {
    tracing::debug!("Getting model: {}", model_id);

    let record = run_blocking(&state, move |facade| facade.get(&model_id)).await??;
    Ok(Json(ModelResponse::from(record)))
}

/// Delete a model by ID
#[debug_handler]
pub async fn delete_model(
    State(state): State<Arc<ApiState>>,
    Path(model_id): Path<String>,
) -> Result<StatusCode> {
    run_blocking(&state, move |facade| facade.delete(&model_id)).await??;
    Ok(StatusCode::NO_CONTENT)
}

/// Predict with a cataloged model
#[debug_handler]
pub async fn predict(
    State(state): State<Arc<ApiState>>,
    Path(model_id): Path<String>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(request) = payload?;

    let predictions = run_blocking(&state, move |facade| {
        facade.predict(&model_id, &request.features)
    })
    .await??;

    Ok(Json(PredictResponse { predictions }))
}

/// Retrain a cataloged model on new data
#[debug_handler]
pub async fn retrain_model(
    State(state): State<Arc<ApiState>>,
    Path(model_id): Path<String>,
    payload: std::result::Result<Json<RetrainRequest>, JsonRejection>,
) -> Result<Json<RetrainResponse>> {
    let Json(request) = payload?;

    let outcome = run_blocking(&state, move |facade| {
        facade.retrain(&model_id, &request.features, &request.y)
    })
    .await??;

    Ok(Json(RetrainResponse {
        status: "retrained".to_string(),
        new_model_id: outcome.new_model_id,
        metrics: outcome.metrics,
    }))
}

/// Metrics recorded for a model
#[debug_handler]
pub async fn get_metrics(
    State(state): State<Arc<ApiState>>,
    Path(model_id): Path<String>,
) -> Result<Json<ClassificationMetrics>> {
    let metrics = run_blocking(&state, move |facade| facade.metrics(&model_id)).await??;
    Ok(Json(metrics))
}
