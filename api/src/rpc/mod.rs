//! JSON-RPC Service
//!
//! Exposes the model service as JSON-RPC 2.0 methods on a single `POST /rpc`
//! endpoint. Model params are rendered as strings and predictions as
//! floats, matching the RPC clients of the service.

pub mod protocol;

use axum::{body::Bytes, debug_handler, extract::State, response::Json};
use modelhub_core::{Label, ModelRecord, ParamMap};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::handlers::{run_blocking, ApiState};
use crate::models::{HealthResponse, ModelClassMap};
pub use protocol::{RpcError, RpcRequest, RpcResponse, JSONRPC_VERSION};

/// Methods served by [`rpc_endpoint`]
pub const METHODS: [&str; 9] = [
    "HealthCheck",
    "GetModelClasses",
    "ListModels",
    "TrainModel",
    "GetModel",
    "DeleteModel",
    "Predict",
    "RetrainModel",
    "GetMetrics",
];

#[derive(Debug, Deserialize)]
struct ModelIdParams {
    model_id: String,
}

#[derive(Debug, Deserialize)]
struct TrainParams {
    model_type: String,
    #[serde(default)]
    params: ParamMap,
    #[serde(rename = "X")]
    features: Vec<Vec<f64>>,
    y: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct PredictParams {
    model_id: String,
    #[serde(rename = "X")]
    features: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RetrainParams {
    model_id: String,
    #[serde(rename = "X")]
    features: Vec<Vec<f64>>,
    y: Vec<Label>,
}

/// Model record as rendered over RPC
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcModel {
    pub id: String,
    pub model_type: String,
    pub params: BTreeMap<String, String>,
    pub created_at: String,
    pub metrics: BTreeMap<String, f64>,
}

impl From<ModelRecord> for RpcModel {
    fn from(record: ModelRecord) -> Self {
        Self {
            created_at: record.created_at_iso(),
            params: stringify_params(&record.params),
            metrics: record.metrics.as_map(),
            id: record.id,
            model_type: record.model_type,
        }
    }
}

fn stringify_params(params: &ParamMap) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

/// JSON-RPC endpoint
#[debug_handler]
pub async fn rpc_endpoint(State(state): State<Arc<ApiState>>, body: Bytes) -> Json<RpcResponse> {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Unparseable RPC payload: {e}");
            return Json(RpcResponse::failure(
                Value::Null,
                RpcError::parse_error(format!("Parse error: {e}")),
            ));
        }
    };

    let request: RpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return Json(RpcResponse::failure(
                Value::Null,
                RpcError::invalid_request(format!("Invalid request: {e}")),
            ))
        }
    };

    let id = request.id.clone().unwrap_or(Value::Null);
    if request.jsonrpc != JSONRPC_VERSION {
        return Json(RpcResponse::failure(
            id,
            RpcError::invalid_request(format!(
                "Unsupported jsonrpc version: {}",
                request.jsonrpc
            )),
        ));
    }

    debug!("RPC call {}", request.method);
    let params = request.params.unwrap_or(Value::Null);
    match dispatch(&state, &request.method, params).await {
        Ok(result) => Json(RpcResponse::success(id, result)),
        Err(error) => Json(RpcResponse::failure(id, error)),
    }
}

async fn dispatch(state: &ApiState, method: &str, params: Value) -> Result<Value, RpcError> {
    match method {
        "HealthCheck" => encode(HealthResponse::ok()),
        "GetModelClasses" => {
            let classes = ModelClassMap::from(state.facade.model_classes());
            Ok(json!({ "model_classes": classes }))
        }
        "ListModels" => {
            let records = run_blocking(state, |facade| facade.list()).await??;
            let models: Vec<RpcModel> = records.into_iter().map(RpcModel::from).collect();
            Ok(json!({ "models": models }))
        }
        "TrainModel" => {
            let p: TrainParams = decode(params)?;
            let outcome = run_blocking(state, move |facade| {
                facade.train(&p.model_type, &p.params, &p.features, &p.y)
            })
            .await??;
            Ok(json!({
                "model_id": outcome.run_id,
                "metrics": outcome.metrics.as_map(),
            }))
        }
        "GetModel" => {
            let p: ModelIdParams = decode(params)?;
            let record = run_blocking(state, move |facade| facade.get(&p.model_id)).await??;
            encode(RpcModel::from(record))
        }
        "DeleteModel" => {
            let p: ModelIdParams = decode(params)?;
            run_blocking(state, move |facade| facade.delete(&p.model_id)).await??;
            Ok(json!({ "success": true }))
        }
        "Predict" => {
            let p: PredictParams = decode(params)?;
            let predictions = run_blocking(state, move |facade| {
                facade.predict(&p.model_id, &p.features)
            })
            .await??;
            let predictions: Vec<f64> = predictions.into_iter().map(|label| label as f64).collect();
            Ok(json!({ "predictions": predictions }))
        }
        "RetrainModel" => {
            let p: RetrainParams = decode(params)?;
            let outcome = run_blocking(state, move |facade| {
                facade.retrain(&p.model_id, &p.features, &p.y)
            })
            .await??;
            Ok(json!({
                "new_model_id": outcome.new_model_id,
                "metrics": outcome.metrics.as_map(),
            }))
        }
        "GetMetrics" => {
            let p: ModelIdParams = decode(params)?;
            let metrics = run_blocking(state, move |facade| facade.metrics(&p.model_id)).await??;
            Ok(json!({ "metrics": metrics.as_map() }))
        }
        other => {
            warn!("Unknown RPC method: {other}");
            let mut error = RpcError::method_not_found(other);
            error.data = Some(json!({ "methods": METHODS }));
            Err(error)
        }
    }
}

fn decode<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(format!("Invalid params: {e}")))
}

fn encode<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify_params() {
        let params = json!({"n_estimators": 10, "criterion": "gini", "C": 0.5, "max_depth": null});
        let rendered = stringify_params(params.as_object().unwrap());

        assert_eq!(rendered["n_estimators"], "10");
        assert_eq!(rendered["criterion"], "gini");
        assert_eq!(rendered["C"], "0.5");
        assert_eq!(rendered["max_depth"], "null");
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let err = decode::<ModelIdParams>(json!({})).unwrap_err();
        assert_eq!(err.code, protocol::INVALID_PARAMS);
    }
}
