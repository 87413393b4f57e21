//! Core types shared by training and the facade

use modelhub_databases::{ClassificationMetrics, ParamMap};
use serde::{Deserialize, Serialize};

/// Class label type used for targets and predictions
pub type Label = i64;

/// Result of a successful training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainOutcome {
    /// Tracking run id, used as the model id
    pub run_id: String,
    /// Training-set metrics (zeros when scoring failed)
    pub metrics: ClassificationMetrics,
    /// Artifact URI of the logged model
    pub artifact_uri: String,
    /// Whether the metrics are placeholders from a failed scoring pass
    pub metrics_degraded: bool,
    /// Hyperparameters after normalization
    pub params: ParamMap,
}

/// Result of a successful retrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainOutcome {
    /// Id of the record that was replaced
    pub old_model_id: String,
    /// Id of the replacement record
    pub new_model_id: String,
    /// Training-set metrics of the replacement
    pub metrics: ClassificationMetrics,
    /// Whether the metrics are placeholders from a failed scoring pass
    pub metrics_degraded: bool,
}
