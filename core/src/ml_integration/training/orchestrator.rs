//! Training orchestration for ML models

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use crate::error::{ModelHubError, Result};
use crate::ml_integration::metadata::{Label, TrainOutcome};
use crate::ml_integration::metrics::{calculate_metrics, MetricsReport};
use crate::ml_integration::model_management::registry;
use crate::ml_integration::params::normalize_params;
use crate::ml_integration::tracking::{TrackingStore, MODEL_ARTIFACT};
use crate::ml_integration::trainer::EstimatorConfig;
use modelhub_databases::ParamMap;

/// Training orchestrator for ML models
///
/// Resolves the model family, fits it, scores it on the training data and
/// records the run in the tracking store. Only one training runs at a time
/// per orchestrator.
pub struct TrainingOrchestrator {
    /// Tracking backend
    tracking: Arc<dyn TrackingStore>,
    /// Serializes training runs
    training_lock: Mutex<()>,
}

impl TrainingOrchestrator {
    /// Create new training orchestrator
    pub fn new(tracking: Arc<dyn TrackingStore>) -> Self {
        Self {
            tracking,
            training_lock: Mutex::new(()),
        }
    }

    pub fn tracking(&self) -> &Arc<dyn TrackingStore> {
        &self.tracking
    }

    /// Train a model and log it as a new tracking run
    pub fn train(
        &self,
        model_type: &str,
        raw_params: &ParamMap,
        features: &[Vec<f64>],
        labels: &[Label],
    ) -> Result<TrainOutcome> {
        let _guard = self
            .training_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.tracking.has_active_session() {
            warn!("Found active tracking run. Ending it forcefully.");
            self.tracking.end_session()?;
        }

        info!("Starting training for {model_type}");

        let family = registry::resolve(model_type)?;
        let params = normalize_params(raw_params);
        let config = EstimatorConfig::from_params(family, &params)?;

        let model = config.fit(features, labels)?;
        let predictions = model
            .predict(features)
            .map_err(|e| ModelHubError::TrainingFailure(format!("Scoring on training data failed: {e}")))?;

        let report = calculate_metrics(labels, &predictions);
        if let MetricsReport::Degraded { reason, .. } = &report {
            warn!("Metrics degraded for {model_type}, recording zeros: {reason}");
        }
        let metrics = report.metrics();

        let mut session = self.tracking.begin_session()?;
        session.log_tag("model_type", family.key())?;
        session.log_params(&params)?;
        session.log_metrics(&metrics.as_map())?;
        let artifact_uri = session.log_model(&model, MODEL_ARTIFACT)?;
        let run_id = session.run_id().to_string();
        session.finish()?;

        info!("Model logged to tracking store. Run ID: {run_id}");

        Ok(TrainOutcome {
            run_id,
            metrics,
            artifact_uri: artifact_uri.to_string(),
            metrics_degraded: report.is_degraded(),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_integration::tracking::file_store::RunStatus;
    use crate::ml_integration::tracking::FileTrackingStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn xor() -> (Vec<Vec<f64>>, Vec<Label>) {
        (
            vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
            ],
            vec![0, 1, 1, 0],
        )
    }

    fn params(value: serde_json::Value) -> ParamMap {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (TempDir, Arc<FileTrackingStore>, TrainingOrchestrator) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileTrackingStore::open(dir.path(), "test").unwrap());
        let orchestrator = TrainingOrchestrator::new(store.clone());
        (dir, store, orchestrator)
    }

    #[test]
    fn test_train_random_forest_logs_run() {
        let (_dir, store, orchestrator) = setup();
        let (x, y) = xor();

        let outcome = orchestrator
            .train(
                "random_forest",
                &params(json!({"n_estimators": "10", "max_depth": "3"})),
                &x,
                &y,
            )
            .unwrap();

        assert!(!outcome.run_id.is_empty());
        assert_eq!(outcome.artifact_uri, format!("runs:/{}/model", outcome.run_id));
        assert!(!outcome.metrics_degraded);
        assert!((0.0..=1.0).contains(&outcome.metrics.accuracy));
        assert_eq!(outcome.params["n_estimators"], json!(10));

        let logged = store.run_params(&outcome.run_id).unwrap();
        assert_eq!(logged["max_depth"], json!(3));
        let metrics = store.run_metrics(&outcome.run_id).unwrap();
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics["accuracy"], outcome.metrics.accuracy);
        assert_eq!(
            store.run_tags(&outcome.run_id).unwrap()["model_type"],
            "random_forest"
        );
        assert_eq!(
            store.run_meta(&outcome.run_id).unwrap().status,
            RunStatus::Finished
        );
        assert!(store.load_artifact(&outcome.artifact_uri).is_ok());
    }

    #[test]
    fn test_unsupported_model_type() {
        let (_dir, _store, orchestrator) = setup();
        let (x, y) = xor();

        let result = orchestrator.train("no_such_model", &ParamMap::new(), &x, &y);
        assert!(matches!(
            result,
            Err(ModelHubError::UnsupportedModelType(_))
        ));
    }

    #[test]
    fn test_invalid_params_fail_before_tracking() {
        let (_dir, store, orchestrator) = setup();
        let (x, y) = xor();

        let result = orchestrator.train(
            "random_forest",
            &params(json!({"n_estimators": "0"})),
            &x,
            &y,
        );
        assert!(matches!(
            result,
            Err(ModelHubError::InvalidHyperparameters(_))
        ));
        assert_eq!(std::fs::read_dir(store.experiment_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_training_failure_on_mismatched_input() {
        let (_dir, _store, orchestrator) = setup();
        let (x, _) = xor();

        let result = orchestrator.train("logistic_regression", &ParamMap::new(), &x, &[0, 1]);
        assert!(matches!(result, Err(ModelHubError::TrainingFailure(_))));
    }

    #[test]
    fn test_stale_session_is_ended_before_training() {
        let (_dir, store, orchestrator) = setup();
        let stale = store.begin_session().unwrap();
        let stale_id = stale.run_id().to_string();
        std::mem::forget(stale);
        assert!(store.has_active_session());

        let (x, y) = xor();
        orchestrator
            .train("random_forest", &params(json!({"n_estimators": 5})), &x, &y)
            .unwrap();

        assert!(!store.has_active_session());
        assert_eq!(store.run_meta(&stale_id).unwrap().status, RunStatus::Killed);
    }

    #[test]
    fn test_training_recovers_when_stale_run_directory_is_gone() {
        let (_dir, store, orchestrator) = setup();
        let stale = store.begin_session().unwrap();
        let stale_id = stale.run_id().to_string();
        std::mem::forget(stale);
        std::fs::remove_dir_all(store.experiment_dir().join(&stale_id)).unwrap();

        let (x, y) = xor();
        for _ in 0..3 {
            orchestrator
                .train("random_forest", &params(json!({"n_estimators": 5})), &x, &y)
                .unwrap();
        }

        assert!(!store.has_active_session());
    }

    #[test]
    fn test_concurrent_training_gets_distinct_runs() {
        let (_dir, _store, orchestrator) = setup();
        let orchestrator = Arc::new(orchestrator);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let orchestrator = orchestrator.clone();
                std::thread::spawn(move || {
                    let (x, y) = xor();
                    orchestrator
                        .train("random_forest", &params(json!({"n_estimators": 3})), &x, &y)
                        .unwrap()
                        .run_id
                })
            })
            .collect();

        let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
