//! API request and response models

use modelhub_core::{ClassificationMetrics, Label, ModelClassInfo, ModelRecord, ParamMap};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Listener configuration for both transports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address
    pub host: String,
    /// REST port
    pub rest_port: u16,
    /// JSON-RPC port
    pub rpc_port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            rest_port: 5000,
            rpc_port: 50051,
        }
    }
}

impl ApiConfig {
    pub fn rest_addr(&self) -> String {
        format!("{}:{}", self.host, self.rest_port)
    }

    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.host, self.rpc_port)
    }
}

/// Body of `POST /models/train`
#[derive(Debug, Clone, Deserialize)]
pub struct TrainRequest {
    /// Registry key of the model family
    pub model_type: String,
    /// Hyperparameters, often string-typed
    #[serde(default)]
    pub params: ParamMap,
    /// Feature rows
    #[serde(rename = "X")]
    pub features: Vec<Vec<f64>>,
    /// Class labels
    pub y: Vec<Label>,
}

/// Body of `POST /models/:id/predict`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "X")]
    pub features: Vec<Vec<f64>>,
}

/// Body of `POST /models/:id/retrain`
#[derive(Debug, Clone, Deserialize)]
pub struct RetrainRequest {
    #[serde(rename = "X")]
    pub features: Vec<Vec<f64>>,
    pub y: Vec<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub model_id: String,
    pub metrics: ClassificationMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainResponse {
    pub status: String,
    pub new_model_id: String,
    pub metrics: ClassificationMetrics,
}

/// Registry entry as listed by `/model-classes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelClassResponse {
    pub class_name: String,
    pub hyperparameters: Vec<String>,
    pub description: String,
}

impl From<ModelClassInfo> for ModelClassResponse {
    fn from(info: ModelClassInfo) -> Self {
        Self {
            class_name: info.class_name,
            hyperparameters: info.hyperparameters,
            description: info.description,
        }
    }
}

/// Registry listing keyed by model type, in registry order
#[derive(Debug, Clone, Default)]
pub struct ModelClassMap(pub Vec<(String, ModelClassResponse)>);

impl From<Vec<ModelClassInfo>> for ModelClassMap {
    fn from(infos: Vec<ModelClassInfo>) -> Self {
        Self(
            infos
                .into_iter()
                .map(|info| (info.key.clone(), ModelClassResponse::from(info)))
                .collect(),
        )
    }
}

impl Serialize for ModelClassMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, class) in &self.0 {
            map.serialize_entry(key, class)?;
        }
        map.end()
    }
}

/// Catalog record as returned to REST clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    pub model_type: String,
    pub params: ParamMap,
    pub created_at: String,
    pub metrics: ClassificationMetrics,
}

impl From<ModelRecord> for ModelResponse {
    fn from(record: ModelRecord) -> Self {
        Self {
            created_at: record.created_at_iso(),
            id: record.id,
            model_type: record.model_type,
            params: record.params,
            metrics: record.metrics,
        }
    }
}
