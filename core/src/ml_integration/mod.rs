//! ML Integration Module
//!
//! This module provides the model lifecycle for ModelHub, from raw client
//! hyperparameters to tracked, cataloged and servable models.
//!
//! # Architecture
//!
//! The module is organized into several submodules:
//! - `params`: Normalization of string-typed hyperparameters
//! - `model_management`: Registry of the supported model families
//! - `trainer`: Typed estimator configs, fitting and prediction
//! - `metrics`: Weighted classification metrics
//! - `tracking`: Experiment tracking store and run sessions
//! - `training`: Training orchestration across the pieces above
//! - `facade`: Catalog-aware entry point used by the transports
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modelhub_core::{FileTrackingStore, ModelFacade, TrainingOrchestrator};
//! use modelhub_databases::SqliteCatalog;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tracking = Arc::new(FileTrackingStore::open("mlruns", "default")?);
//! let catalog = Arc::new(SqliteCatalog::open("modelhub.db")?);
//! let facade = ModelFacade::new(TrainingOrchestrator::new(tracking), catalog);
//!
//! let classes = facade.model_classes();
//! # let _ = classes;
//! # Ok(())
//! # }
//! ```

pub mod facade;
pub mod metadata;
pub mod metrics;
pub mod model_management;
pub mod params;
pub mod tracking;
pub mod trainer;
pub mod training;

// Re-export key types for convenience
pub use metadata::{Label, RetrainOutcome, TrainOutcome};
pub use metrics::{calculate_metrics, MetricsReport};
pub use trainer::{EstimatorConfig, FittedModel};
