//! Error types for the model lifecycle

use modelhub_databases::CatalogError;

/// Errors surfaced by the model service
#[derive(Debug, thiserror::Error)]
pub enum ModelHubError {
    #[error("Unsupported model type: {0}")]
    UnsupportedModelType(String),

    #[error("Invalid hyperparameters: {0}")]
    InvalidHyperparameters(String),

    #[error("Training failed: {0}")]
    TrainingFailure(String),

    #[error("Failed to load model artifact {uri}: {reason}")]
    ArtifactLoadFailure { uri: String, reason: String },

    #[error("Prediction failed: {0}")]
    PredictionFailure(String),

    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Tracking store error: {0}")]
    Tracking(String),

    #[error("Catalog error: {0}")]
    Catalog(CatalogError),
}

/// Coarse grouping used by the transports to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was unacceptable
    Client,
    /// The referenced model does not exist
    NotFound,
    /// Anything that went wrong on our side
    Server,
}

impl ModelHubError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedModelType(_) | Self::InvalidHyperparameters(_) => ErrorClass::Client,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::TrainingFailure(_)
            | Self::ArtifactLoadFailure { .. }
            | Self::PredictionFailure(_)
            | Self::Tracking(_)
            | Self::Catalog(_) => ErrorClass::Server,
        }
    }

    pub(crate) fn tracking(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Tracking(format!("{context}: {err}"))
    }
}

impl From<CatalogError> for ModelHubError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => Self::NotFound(id),
            other => Self::Catalog(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelHubError>;
