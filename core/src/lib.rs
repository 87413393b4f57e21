//! ModelHub Core Module
//!
//! The core module provides the model lifecycle: hyperparameter
//! normalization, the model class registry, estimator training and
//! scoring, experiment tracking, and the facade the transports call into.

pub mod error;
pub mod ml_integration;

pub use error::{ErrorClass, ModelHubError, Result};
pub use ml_integration::facade::ModelFacade;
pub use ml_integration::metadata::{Label, RetrainOutcome, TrainOutcome};
pub use ml_integration::metrics::{calculate_metrics, MetricsReport};
pub use ml_integration::model_management::registry::{self, ModelClassInfo, ModelFamily};
pub use ml_integration::params::normalize_params;
pub use ml_integration::trainer::{EstimatorConfig, FittedModel};
pub use ml_integration::tracking::{
    ArtifactUri, FileTrackingStore, RunSession, TrackingStore, MODEL_ARTIFACT,
};
pub use ml_integration::training::TrainingOrchestrator;

pub use modelhub_databases::{ClassificationMetrics, ModelRecord, ParamMap};
