//! Catalog record types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hyperparameter mapping as received from clients or after normalization
pub type ParamMap = serde_json::Map<String, serde_json::Value>;

/// Weighted classification scores recorded for a trained model
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// Fraction of exactly correct predictions
    pub accuracy: f64,
    /// Support-weighted precision across classes
    pub precision: f64,
    /// Support-weighted recall across classes
    pub recall: f64,
}

impl ClassificationMetrics {
    /// All-zero metrics, used when scoring fails
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Name/value pairs as logged to the tracking store
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("accuracy".to_string(), self.accuracy),
            ("precision".to_string(), self.precision),
            ("recall".to_string(), self.recall),
        ])
    }
}

/// One trained model known to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Tracking run id, also the public model id
    pub id: String,
    /// Registry key of the model family
    pub model_type: String,
    /// Hyperparameters the model was trained with
    pub params: ParamMap,
    /// Artifact URI of the serialized model in the tracking store
    pub file_path: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Training-set metrics
    pub metrics: ClassificationMetrics,
}

impl ModelRecord {
    /// Create a record stamped with the current time
    pub fn new(
        id: impl Into<String>,
        model_type: impl Into<String>,
        params: ParamMap,
        file_path: impl Into<String>,
        metrics: ClassificationMetrics,
    ) -> Self {
        Self {
            id: id.into(),
            model_type: model_type.into(),
            params,
            file_path: file_path.into(),
            created_at: Utc::now(),
            metrics,
        }
    }

    /// ISO-8601 creation timestamp as exposed by the transports
    pub fn created_at_iso(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}
