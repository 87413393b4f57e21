//! File-backed Tracking Store
//!
//! Runs are stored under `<root>/<experiment>/<run_id>/`:
//!
//! ```text
//! meta.json                     run id, status, start and end time
//! tags.json                     string tags
//! params.json                   logged hyperparameters
//! metrics.json                  logged metric values
//! artifacts/<path>/model.json   serialized fitted model
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ModelHubError, Result};
use crate::ml_integration::trainer::FittedModel;
use crate::ml_integration::tracking::{parse_artifact_uri, ArtifactUri, RunSession, TrackingStore};
use modelhub_databases::ParamMap;

const META_FILE: &str = "meta.json";
const TAGS_FILE: &str = "tags.json";
const PARAMS_FILE: &str = "params.json";
const METRICS_FILE: &str = "metrics.json";
const ARTIFACTS_DIR: &str = "artifacts";
const MODEL_FILE: &str = "model.json";

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

/// Run metadata as stored in `meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub experiment: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Tracking store writing runs to a local directory tree
pub struct FileTrackingStore {
    /// `<root>/<experiment>`
    experiment_dir: PathBuf,
    /// Experiment name
    experiment: String,
    /// Runs currently marked RUNNING
    active: Mutex<HashSet<String>>,
}

impl FileTrackingStore {
    /// Open the experiment under `root`, creating it if needed
    pub fn open(root: impl AsRef<Path>, experiment: &str) -> Result<Self> {
        let experiment_dir = root.as_ref().join(experiment);
        fs::create_dir_all(&experiment_dir)
            .map_err(|e| ModelHubError::tracking("Failed to create experiment directory", e))?;

        info!(
            "Tracking experiment '{experiment}' at {}",
            experiment_dir.display()
        );

        let store = Self {
            experiment_dir,
            experiment: experiment.to_string(),
            active: Mutex::new(HashSet::new()),
        };

        let unfinished = store.scan_unfinished()?;
        if !unfinished.is_empty() {
            warn!(
                "Found {} unfinished run(s) from a previous process",
                unfinished.len()
            );
        }
        *store.active() = unfinished;

        Ok(store)
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn experiment_dir(&self) -> &Path {
        &self.experiment_dir
    }

    pub fn run_meta(&self, run_id: &str) -> Result<RunMeta> {
        read_json(&self.run_dir(run_id).join(META_FILE))
    }

    pub fn run_tags(&self, run_id: &str) -> Result<BTreeMap<String, String>> {
        read_json(&self.run_dir(run_id).join(TAGS_FILE))
    }

    pub fn run_params(&self, run_id: &str) -> Result<ParamMap> {
        read_json(&self.run_dir(run_id).join(PARAMS_FILE))
    }

    pub fn run_metrics(&self, run_id: &str) -> Result<BTreeMap<String, f64>> {
        read_json(&self.run_dir(run_id).join(METRICS_FILE))
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.experiment_dir.join(run_id)
    }

    fn active(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scan_unfinished(&self) -> Result<HashSet<String>> {
        let entries = fs::read_dir(&self.experiment_dir)
            .map_err(|e| ModelHubError::tracking("Failed to read experiment directory", e))?;

        let mut unfinished = HashSet::new();
        for entry in entries.flatten() {
            let meta_path = entry.path().join(META_FILE);
            if !meta_path.is_file() {
                continue;
            }
            match read_json::<RunMeta>(&meta_path) {
                Ok(meta) if meta.status == RunStatus::Running => {
                    unfinished.insert(meta.run_id);
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable run metadata {}: {e}", meta_path.display()),
            }
        }
        Ok(unfinished)
    }

    /// Close a run. It leaves the active set even when its metadata cannot
    /// be rewritten.
    fn set_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.active().remove(run_id);

        let meta_path = self.run_dir(run_id).join(META_FILE);
        let mut meta: RunMeta = read_json(&meta_path)?;
        meta.status = status;
        meta.end_time = Some(Utc::now());
        write_json(&meta_path, &meta)?;

        debug!("Run {run_id} marked {status:?}");
        Ok(())
    }
}

impl TrackingStore for FileTrackingStore {
    fn has_active_session(&self) -> bool {
        !self.active().is_empty()
    }

    fn end_session(&self) -> Result<()> {
        let open: Vec<String> = self.active().iter().cloned().collect();
        for run_id in open {
            warn!("Ending unfinished run {run_id}");
            if let Err(e) = self.set_status(&run_id, RunStatus::Killed) {
                warn!("Dropped unfinished run {run_id} without updating it: {e}");
            }
        }
        Ok(())
    }

    fn begin_session(&self) -> Result<Box<dyn RunSession + '_>> {
        let run_id = Uuid::new_v4().simple().to_string();
        let dir = self.run_dir(&run_id);
        fs::create_dir_all(dir.join(ARTIFACTS_DIR))
            .map_err(|e| ModelHubError::tracking("Failed to create run directory", e))?;

        let meta = RunMeta {
            run_id: run_id.clone(),
            experiment: self.experiment.clone(),
            status: RunStatus::Running,
            start_time: Utc::now(),
            end_time: None,
        };
        write_json(&dir.join(META_FILE), &meta)?;
        self.active().insert(run_id.clone());

        info!("Started tracking run {run_id}");

        Ok(Box::new(FileRunSession {
            store: self,
            run_id,
            dir,
            tags: BTreeMap::new(),
            params: ParamMap::new(),
            metrics: BTreeMap::new(),
            finished: false,
        }))
    }

    fn load_artifact(&self, uri: &str) -> Result<FittedModel> {
        let parsed = parse_artifact_uri(uri)?;
        let path = self
            .run_dir(parsed.run_id())
            .join(ARTIFACTS_DIR)
            .join(parsed.artifact_path())
            .join(MODEL_FILE);

        debug!("Loading model artifact from {}", path.display());

        let bytes = fs::read(&path).map_err(|e| ModelHubError::ArtifactLoadFailure {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ModelHubError::ArtifactLoadFailure {
            uri: uri.to_string(),
            reason: format!("corrupt model artifact: {e}"),
        })
    }
}

struct FileRunSession<'a> {
    store: &'a FileTrackingStore,
    run_id: String,
    dir: PathBuf,
    tags: BTreeMap<String, String>,
    params: ParamMap,
    metrics: BTreeMap<String, f64>,
    finished: bool,
}

impl RunSession for FileRunSession<'_> {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn log_tag(&mut self, key: &str, value: &str) -> Result<()> {
        self.tags.insert(key.to_string(), value.to_string());
        write_json(&self.dir.join(TAGS_FILE), &self.tags)
    }

    fn log_params(&mut self, params: &ParamMap) -> Result<()> {
        self.params
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        write_json(&self.dir.join(PARAMS_FILE), &self.params)
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        self.metrics.extend(metrics.iter().map(|(k, v)| (k.clone(), *v)));
        write_json(&self.dir.join(METRICS_FILE), &self.metrics)
    }

    fn log_model(&mut self, model: &FittedModel, artifact_path: &str) -> Result<ArtifactUri> {
        let uri = ArtifactUri::new(self.run_id.clone(), artifact_path);
        // validates the path before touching the filesystem
        let uri = parse_artifact_uri(&uri.to_string())
            .map_err(|e| ModelHubError::tracking("Invalid artifact path", e))?;

        let dir = self.dir.join(ARTIFACTS_DIR).join(uri.artifact_path());
        fs::create_dir_all(&dir)
            .map_err(|e| ModelHubError::tracking("Failed to create artifact directory", e))?;
        write_json(&dir.join(MODEL_FILE), model)?;

        debug!("Logged {} model artifact at {uri}", model.family());
        Ok(uri)
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.store.set_status(&self.run_id, RunStatus::Finished)?;
        self.finished = true;
        info!("Finished tracking run {}", self.run_id);
        Ok(())
    }
}

impl Drop for FileRunSession<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Tracking run {} dropped before finishing", self.run_id);
        if let Err(e) = self.store.set_status(&self.run_id, RunStatus::Failed) {
            warn!("Failed to mark run {} as failed: {e}", self.run_id);
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .map_err(|e| ModelHubError::tracking(&format!("Failed to read {}", path.display()), e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ModelHubError::tracking(&format!("Failed to parse {}", path.display()), e))
}

/// Write through a temporary file so readers never see a partial document
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| ModelHubError::tracking("Failed to serialize tracking data", e))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)
        .map_err(|e| ModelHubError::tracking(&format!("Failed to write {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .map_err(|e| ModelHubError::tracking(&format!("Failed to write {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_integration::trainer::{EstimatorConfig, LogisticRegressionConfig};
    use crate::ml_integration::tracking::MODEL_ARTIFACT;
    use serde_json::json;
    use tempfile::TempDir;

    fn fitted() -> (FittedModel, Vec<Vec<f64>>) {
        let x = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.2],
            vec![4.0, 4.0],
            vec![4.2, 3.9],
        ];
        let model = EstimatorConfig::LogisticRegression(LogisticRegressionConfig::default())
            .fit(&x, &[0, 0, 1, 1])
            .unwrap();
        (model, x)
    }

    #[test]
    fn test_session_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = FileTrackingStore::open(dir.path(), "unit").unwrap();
        let (model, x) = fitted();

        let mut session = store.begin_session().unwrap();
        let run_id = session.run_id().to_string();
        assert!(store.has_active_session());

        session.log_tag("model_type", "logistic_regression").unwrap();
        let mut params = ParamMap::new();
        params.insert("C".to_string(), json!(1.0));
        session.log_params(&params).unwrap();
        session
            .log_metrics(&BTreeMap::from([("accuracy".to_string(), 1.0)]))
            .unwrap();
        let uri = session.log_model(&model, MODEL_ARTIFACT).unwrap();
        session.finish().unwrap();

        assert_eq!(uri.to_string(), format!("runs:/{run_id}/model"));
        assert!(!store.has_active_session());
        assert_eq!(store.run_meta(&run_id).unwrap().status, RunStatus::Finished);
        assert_eq!(store.run_tags(&run_id).unwrap()["model_type"], "logistic_regression");
        assert_eq!(store.run_params(&run_id).unwrap()["C"], json!(1.0));
        assert_eq!(store.run_metrics(&run_id).unwrap()["accuracy"], 1.0);

        let loaded = store.load_artifact(&uri.to_string()).unwrap();
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn test_dropped_session_is_failed() {
        let dir = TempDir::new().unwrap();
        let store = FileTrackingStore::open(dir.path(), "unit").unwrap();

        let run_id = {
            let session = store.begin_session().unwrap();
            session.run_id().to_string()
        };

        assert!(!store.has_active_session());
        assert_eq!(store.run_meta(&run_id).unwrap().status, RunStatus::Failed);
    }

    #[test]
    fn test_stale_run_recovered_on_open() {
        let dir = TempDir::new().unwrap();
        let run_id = {
            let store = FileTrackingStore::open(dir.path(), "unit").unwrap();
            let session = store.begin_session().unwrap();
            let run_id = session.run_id().to_string();
            // simulate a crash: the session never finishes or drops
            std::mem::forget(session);
            run_id
        };

        let store = FileTrackingStore::open(dir.path(), "unit").unwrap();
        assert!(store.has_active_session());

        store.end_session().unwrap();
        assert!(!store.has_active_session());

        let meta = store.run_meta(&run_id).unwrap();
        assert_eq!(meta.status, RunStatus::Killed);
        assert!(meta.end_time.is_some());
    }

    #[test]
    fn test_stale_run_with_missing_directory_is_released() {
        let dir = TempDir::new().unwrap();
        let store = FileTrackingStore::open(dir.path(), "unit").unwrap();
        let session = store.begin_session().unwrap();
        let run_id = session.run_id().to_string();
        std::mem::forget(session);

        fs::remove_dir_all(store.experiment_dir().join(&run_id)).unwrap();
        assert!(store.has_active_session());

        store.end_session().unwrap();
        assert!(!store.has_active_session());
        assert!(store.run_meta(&run_id).is_err());
    }

    #[test]
    fn test_failed_finish_leaves_no_active_run() {
        let dir = TempDir::new().unwrap();
        let store = FileTrackingStore::open(dir.path(), "unit").unwrap();
        let session = store.begin_session().unwrap();
        let run_id = session.run_id().to_string();

        fs::remove_dir_all(store.experiment_dir().join(&run_id)).unwrap();

        assert!(session.finish().is_err());
        assert!(!store.has_active_session());
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let store = FileTrackingStore::open(dir.path(), "unit").unwrap();

        for uri in ["runs:/deadbeef/model", "not-a-uri"] {
            assert!(matches!(
                store.load_artifact(uri),
                Err(ModelHubError::ArtifactLoadFailure { .. })
            ));
        }
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = TempDir::new().unwrap();
        let store = FileTrackingStore::open(dir.path(), "unit").unwrap();

        let model_dir = store.experiment_dir().join("abc").join(ARTIFACTS_DIR).join("model");
        fs::create_dir_all(&model_dir).unwrap();
        fs::write(model_dir.join(MODEL_FILE), b"{not json").unwrap();

        match store.load_artifact("runs:/abc/model") {
            Err(ModelHubError::ArtifactLoadFailure { reason, .. }) => {
                assert!(reason.contains("corrupt"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
