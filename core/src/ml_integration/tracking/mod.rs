//! Experiment Tracking
//!
//! Every training run is recorded in a tracking store as a session that
//! carries tags, parameters, metrics and the serialized model artifact.
//! Artifacts are addressed by URIs of the form `runs:/{run_id}/{path}`.

pub mod file_store;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelHubError, Result};
use crate::ml_integration::trainer::FittedModel;
use modelhub_databases::ParamMap;

pub use file_store::FileTrackingStore;

/// Artifact path the orchestrator logs fitted models under
pub const MODEL_ARTIFACT: &str = "model";

const URI_SCHEME: &str = "runs:/";

/// Address of an artifact logged by a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactUri {
    run_id: String,
    artifact_path: String,
}

impl ArtifactUri {
    pub fn new(run_id: impl Into<String>, artifact_path: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            artifact_path: artifact_path.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn artifact_path(&self) -> &str {
        &self.artifact_path
    }
}

impl fmt::Display for ArtifactUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{URI_SCHEME}{}/{}", self.run_id, self.artifact_path)
    }
}

impl FromStr for ArtifactUri {
    type Err = String;

    fn from_str(uri: &str) -> std::result::Result<Self, Self::Err> {
        let rest = uri
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| format!("expected a {URI_SCHEME} URI"))?;
        let (run_id, artifact_path) = rest
            .split_once('/')
            .ok_or_else(|| "missing artifact path".to_string())?;

        if run_id.is_empty() || !run_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!("invalid run id: {run_id:?}"));
        }
        let segments_ok = artifact_path
            .split('/')
            .all(|s| !s.is_empty() && s != "." && s != "..");
        if !segments_ok {
            return Err(format!("invalid artifact path: {artifact_path:?}"));
        }

        Ok(Self::new(run_id, artifact_path))
    }
}

/// One open tracking run. Dropping a session without calling
/// [`RunSession::finish`] records the run as failed.
pub trait RunSession: Send {
    fn run_id(&self) -> &str;

    fn log_tag(&mut self, key: &str, value: &str) -> Result<()>;

    fn log_params(&mut self, params: &ParamMap) -> Result<()>;

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()>;

    /// Persist the fitted model under `artifact_path` and return its URI
    fn log_model(&mut self, model: &FittedModel, artifact_path: &str) -> Result<ArtifactUri>;

    /// Mark the run finished
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Experiment tracking backend
pub trait TrackingStore: Send + Sync {
    /// Whether a run is still open, e.g. left behind by a crashed process
    fn has_active_session(&self) -> bool;

    /// End every open run, marking it killed
    fn end_session(&self) -> Result<()>;

    fn begin_session(&self) -> Result<Box<dyn RunSession + '_>>;

    /// Load a model logged by [`RunSession::log_model`]
    fn load_artifact(&self, uri: &str) -> Result<FittedModel>;
}

pub(crate) fn parse_artifact_uri(uri: &str) -> Result<ArtifactUri> {
    uri.parse().map_err(|reason| ModelHubError::ArtifactLoadFailure {
        uri: uri.to_string(),
        reason,
    })
}
