//! Model Training Methods
//!
//! Typed estimator configurations built from normalized hyperparameters,
//! the supervised fitting routines, and the fitted model wrapper that is
//! logged as an artifact and served for prediction.

pub mod estimator;
pub mod supervised;

// Re-export the estimator surface for convenience
pub use estimator::{
    Criterion, EstimatorConfig, FittedModel, LogisticRegressionConfig, RandomForestConfig, Solver,
};
pub use supervised::{train_logistic_regression, train_random_forest};
