//! Model Service Facade
//!
//! Single entry point used by the REST and RPC transports. Combines the
//! training orchestrator with the model catalog and serializes mutating
//! operations on the same model id.

use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ml_integration::metadata::{Label, RetrainOutcome, TrainOutcome};
use crate::ml_integration::model_management::{registry, ModelClassInfo};
use crate::ml_integration::training::TrainingOrchestrator;
use modelhub_databases::{CatalogStore, ClassificationMetrics, ModelRecord, ParamMap};

/// Model lifecycle facade
pub struct ModelFacade {
    /// Training pipeline
    orchestrator: TrainingOrchestrator,
    /// Model catalog
    catalog: Arc<dyn CatalogStore>,
    /// Per-id locks for retrain/delete/predict
    id_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ModelFacade {
    pub fn new(orchestrator: TrainingOrchestrator, catalog: Arc<dyn CatalogStore>) -> Self {
        debug!("Creating model facade");
        Self {
            orchestrator,
            catalog,
            id_locks: DashMap::new(),
        }
    }

    pub fn orchestrator(&self) -> &TrainingOrchestrator {
        &self.orchestrator
    }

    /// Registry entries
    pub fn model_classes(&self) -> Vec<ModelClassInfo> {
        registry::list_all()
    }

    /// Train a model and add it to the catalog.
    ///
    /// The record keeps the params exactly as received.
    pub fn train(
        &self,
        model_type: &str,
        params: &ParamMap,
        features: &[Vec<f64>],
        labels: &[Label],
    ) -> Result<TrainOutcome> {
        let outcome = self
            .orchestrator
            .train(model_type, params, features, labels)?;

        let record = ModelRecord::new(
            outcome.run_id.clone(),
            model_type,
            params.clone(),
            outcome.artifact_uri.clone(),
            outcome.metrics,
        );
        self.catalog.create(&record)?;

        info!("Model {} trained and saved to database", record.id);
        Ok(outcome)
    }

    pub fn list(&self) -> Result<Vec<ModelRecord>> {
        Ok(self.catalog.list()?)
    }

    pub fn get(&self, model_id: &str) -> Result<ModelRecord> {
        Ok(self.catalog.get(model_id)?)
    }

    pub fn metrics(&self, model_id: &str) -> Result<ClassificationMetrics> {
        Ok(self.catalog.get(model_id)?.metrics)
    }

    pub fn delete(&self, model_id: &str) -> Result<()> {
        self.with_id_lock(model_id, || {
            self.catalog.delete(model_id)?;
            info!("Model {model_id} deleted");
            Ok(())
        })
    }

    /// Predict with a cataloged model
    pub fn predict(&self, model_id: &str, features: &[Vec<f64>]) -> Result<Vec<Label>> {
        self.with_id_lock(model_id, || {
            let record = self.catalog.get(model_id)?;
            let model = self.orchestrator.tracking().load_artifact(&record.file_path)?;
            let predictions = model.predict(features)?;

            debug!("Model {model_id} predicted {} rows", predictions.len());
            Ok(predictions)
        })
    }

    /// Retrain a cataloged model on new data.
    ///
    /// The old record is replaced only when training succeeds; the old id
    /// stops resolving afterwards.
    pub fn retrain(
        &self,
        model_id: &str,
        features: &[Vec<f64>],
        labels: &[Label],
    ) -> Result<RetrainOutcome> {
        self.with_id_lock(model_id, || self.retrain_locked(model_id, features, labels))
    }

    fn retrain_locked(
        &self,
        model_id: &str,
        features: &[Vec<f64>],
        labels: &[Label],
    ) -> Result<RetrainOutcome> {
        let old = match self.catalog.get(model_id) {
            Ok(record) => record,
            Err(e) => {
                warn!("Retrain of model {model_id} aborted: {e}");
                return Err(e.into());
            }
        };

        info!("Retraining model {model_id} ({})", old.model_type);
        let outcome = self
            .orchestrator
            .train(&old.model_type, &old.params, features, labels)?;

        let record = ModelRecord::new(
            outcome.run_id.clone(),
            old.model_type.clone(),
            old.params.clone(),
            outcome.artifact_uri.clone(),
            outcome.metrics,
        );
        self.catalog.replace(model_id, &record)?;

        info!("Model {model_id} retrained as {}", record.id);
        Ok(RetrainOutcome {
            old_model_id: model_id.to_string(),
            new_model_id: outcome.run_id,
            metrics: outcome.metrics,
            metrics_degraded: outcome.metrics_degraded,
        })
    }

    /// Run `op` while holding the lock for `model_id`.
    ///
    /// The map entry is dropped afterwards unless another caller holds a
    /// clone of the same lock, so failed lookups leave nothing behind.
    fn with_id_lock<T>(&self, model_id: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self
            .id_locks
            .entry(model_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            op()
        };

        // one reference in the map, one here
        self.id_locks.remove_if(model_id, |_, held| {
            Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2
        });
        result
    }
}
