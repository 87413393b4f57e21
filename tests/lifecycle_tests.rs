//! End-to-end model lifecycle against on-disk stores

use modelhub::cli::build_facade;
use modelhub::settings::{CatalogSettings, LoggingSettings, Settings, TrackingSettings};
use modelhub_api::ApiConfig;
use modelhub_core::ml_integration::tracking::file_store::RunStatus;
use modelhub_core::{FileTrackingStore, ModelHubError, ParamMap};
use serde_json::json;
use tempfile::TempDir;

fn settings(dir: &TempDir) -> Settings {
    Settings {
        server: ApiConfig::default(),
        catalog: CatalogSettings {
            database_path: dir.path().join("modelhub.db"),
        },
        tracking: TrackingSettings {
            root: dir.path().join("mlruns"),
            experiment: "lifecycle".to_string(),
        },
        logging: LoggingSettings {
            directory: dir.path().join("logs"),
            level: "info".to_string(),
            json: false,
            max_files: 1,
        },
    }
}

fn xor() -> (Vec<Vec<f64>>, Vec<i64>) {
    let mut features = Vec::new();
    let mut labels = Vec::new();
    for _ in 0..5 {
        features.extend([
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ]);
        labels.extend([0, 1, 1, 0]);
    }
    (features, labels)
}

fn params(value: serde_json::Value) -> ParamMap {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_train_track_and_catalog() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    let facade = build_facade(&settings).unwrap();
    let (features, labels) = xor();

    let raw = params(json!({"n_estimators": "10", "max_depth": "3"}));
    let outcome = facade
        .train("random_forest", &raw, &features, &labels)
        .unwrap();

    assert_eq!(outcome.artifact_uri, format!("runs:/{}/model", outcome.run_id));
    assert_eq!(outcome.params["n_estimators"], json!(10));
    assert!(!outcome.metrics_degraded);

    let record = facade.get(&outcome.run_id).unwrap();
    assert_eq!(record.params, raw);
    assert_eq!(record.file_path, outcome.artifact_uri);
    assert_eq!(record.metrics, outcome.metrics);

    let tracking = FileTrackingStore::open(&settings.tracking.root, "lifecycle").unwrap();
    let meta = tracking.run_meta(&outcome.run_id).unwrap();
    assert_eq!(meta.status, RunStatus::Finished);
    assert_eq!(tracking.run_params(&outcome.run_id).unwrap()["max_depth"], json!(3));
    assert_eq!(tracking.run_tags(&outcome.run_id).unwrap()["model_type"], "random_forest");

    let metrics = tracking.run_metrics(&outcome.run_id).unwrap();
    let keys: Vec<&str> = metrics.keys().map(String::as_str).collect();
    assert_eq!(keys, ["accuracy", "precision", "recall"]);
}

#[test]
fn test_models_survive_restart() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    let (features, labels) = xor();

    let model_id = {
        let facade = build_facade(&settings).unwrap();
        facade
            .train("random_forest", &ParamMap::new(), &features, &labels)
            .unwrap()
            .run_id
    };

    let facade = build_facade(&settings).unwrap();
    let listed = facade.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, model_id);

    let predictions = facade
        .predict(&model_id, &[vec![0.0, 1.0], vec![1.0, 1.0]])
        .unwrap();
    assert_eq!(predictions, vec![1, 0]);
}

#[test]
fn test_retrain_then_delete() {
    let dir = TempDir::new().unwrap();
    let facade = build_facade(&settings(&dir)).unwrap();

    let original = facade
        .train(
            "logistic_regression",
            &params(json!({"C": "0.5"})),
            &[vec![0.0], vec![0.5], vec![5.0], vec![5.5]],
            &[0, 0, 1, 1],
        )
        .unwrap();

    let retrained = facade
        .retrain(
            &original.run_id,
            &[vec![1.0], vec![2.0], vec![8.0], vec![9.0]],
            &[0, 0, 1, 1],
        )
        .unwrap();
    assert_eq!(retrained.old_model_id, original.run_id);
    assert!(matches!(
        facade.get(&original.run_id),
        Err(ModelHubError::NotFound(_))
    ));

    let record = facade.get(&retrained.new_model_id).unwrap();
    assert_eq!(record.model_type, "logistic_regression");
    assert_eq!(record.params["C"], "0.5");

    facade.delete(&retrained.new_model_id).unwrap();
    assert!(matches!(
        facade.get(&retrained.new_model_id),
        Err(ModelHubError::NotFound(_))
    ));
    assert!(facade.list().unwrap().is_empty());
}
