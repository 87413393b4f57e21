//! Model Class Registry
//!
//! Static catalog of the supported model families, keyed by the string
//! clients send as `model_type`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::error::{ModelHubError, Result};

/// Supported model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Random forest classifier
    RandomForest,
    /// Logistic regression classifier
    LogisticRegression,
}

/// Public description of one registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelClassInfo {
    /// Registry key, e.g. `random_forest`
    pub key: String,
    /// Estimator class name
    pub class_name: String,
    /// Commonly tuned hyperparameters
    pub hyperparameters: Vec<String>,
    /// One-line description
    pub description: String,
}

struct RegistryEntry {
    family: ModelFamily,
    key: &'static str,
    class_name: &'static str,
    hyperparameters: &'static [&'static str],
    description: &'static str,
}

static AVAILABLE_MODELS: [RegistryEntry; 2] = [
    RegistryEntry {
        family: ModelFamily::RandomForest,
        key: "random_forest",
        class_name: "RandomForestClassifier",
        hyperparameters: &["n_estimators", "max_depth", "random_state"],
        description: "Random Forest Classifier",
    },
    RegistryEntry {
        family: ModelFamily::LogisticRegression,
        key: "logistic_regression",
        class_name: "LogisticRegression",
        hyperparameters: &["C", "solver", "max_iter"],
        description: "Logistic Regression",
    },
];

impl ModelFamily {
    pub const ALL: [ModelFamily; 2] = [ModelFamily::RandomForest, ModelFamily::LogisticRegression];

    fn entry(self) -> &'static RegistryEntry {
        match self {
            ModelFamily::RandomForest => &AVAILABLE_MODELS[0],
            ModelFamily::LogisticRegression => &AVAILABLE_MODELS[1],
        }
    }

    /// Registry key
    pub fn key(self) -> &'static str {
        self.entry().key
    }

    /// Estimator class name
    pub fn class_name(self) -> &'static str {
        self.entry().class_name
    }

    /// Advertised hyperparameter names
    pub fn hyperparameters(self) -> &'static [&'static str] {
        self.entry().hyperparameters
    }

    pub fn info(self) -> ModelClassInfo {
        let entry = self.entry();
        ModelClassInfo {
            key: entry.key.to_string(),
            class_name: entry.class_name.to_string(),
            hyperparameters: entry.hyperparameters.iter().map(|s| s.to_string()).collect(),
            description: entry.description.to_string(),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Look up a family by its registry key. Keys are case-sensitive.
pub fn resolve(model_type: &str) -> Result<ModelFamily> {
    match AVAILABLE_MODELS.iter().find(|entry| entry.key == model_type) {
        Some(entry) => {
            debug!("Resolved model type {model_type} to {}", entry.class_name);
            Ok(entry.family)
        }
        None => {
            warn!("Unsupported model type requested: {model_type}");
            Err(ModelHubError::UnsupportedModelType(model_type.to_string()))
        }
    }
}

/// Every registry entry, in registry order
pub fn list_all() -> Vec<ModelClassInfo> {
    ModelFamily::ALL.iter().map(|family| family.info()).collect()
}
