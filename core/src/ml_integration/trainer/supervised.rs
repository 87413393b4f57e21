//! Supervised Learning Training Methods

use smartcore::ensemble::random_forest_classifier::RandomForestClassifierParameters;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{
    LogisticRegressionParameters, LogisticRegressionSolverName,
};
use smartcore::tree::decision_tree_classifier::SplitCriterion;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::error::{ModelHubError, Result};
use crate::ml_integration::metadata::Label;
use crate::ml_integration::trainer::estimator::{
    Criterion, FittedEstimator, FittedModel, Forest, Logit, LogisticRegressionConfig,
    RandomForestConfig,
};

pub fn train_random_forest(
    features: &[Vec<f64>],
    labels: &[Label],
    config: &RandomForestConfig,
) -> Result<FittedModel> {
    let (x, n_features) = training_inputs(features, labels)?;

    info!(
        "Starting Random Forest training with {} samples and {} features",
        features.len(),
        n_features
    );

    if let Some(m) = config.max_features {
        if m > n_features {
            return Err(ModelHubError::InvalidHyperparameters(format!(
                "max_features ({m}) exceeds the number of features ({n_features})"
            )));
        }
    }

    let mut parameters = RandomForestClassifierParameters::default()
        .with_n_trees(config.n_estimators)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_seed(config.random_state)
        .with_criterion(match config.criterion {
            Criterion::Gini => SplitCriterion::Gini,
            Criterion::Entropy => SplitCriterion::Entropy,
        });
    if let Some(depth) = config.max_depth {
        parameters = parameters.with_max_depth(depth);
    }
    if let Some(m) = config.max_features {
        parameters = parameters.with_m(m);
    }

    let y = labels.to_vec();
    let forest = Forest::fit(&x, &y, parameters).map_err(|e| {
        ModelHubError::TrainingFailure(format!("Random forest training failed: {e}"))
    })?;

    info!("Random forest training completed successfully");

    Ok(FittedModel::new(
        n_features,
        FittedEstimator::RandomForest(forest),
    ))
}

pub fn train_logistic_regression(
    features: &[Vec<f64>],
    labels: &[Label],
    config: &LogisticRegressionConfig,
) -> Result<FittedModel> {
    let (x, n_features) = training_inputs(features, labels)?;

    info!(
        "Starting Logistic Regression training with {} samples and {} features",
        features.len(),
        n_features
    );

    let classes: BTreeSet<Label> = labels.iter().copied().collect();
    if classes.len() < 2 {
        return Err(ModelHubError::TrainingFailure(format!(
            "Logistic regression needs at least 2 classes, got {}",
            classes.len()
        )));
    }

    debug!(
        "Logistic regression with C={} (alpha={}), max_iter={}",
        config.c,
        config.alpha(),
        config.max_iter
    );

    let parameters = LogisticRegressionParameters::default()
        .with_solver(LogisticRegressionSolverName::LBFGS)
        .with_alpha(config.alpha());

    let y = labels.to_vec();
    let model = Logit::fit(&x, &y, parameters).map_err(|e| {
        ModelHubError::TrainingFailure(format!("Logistic regression training failed: {e}"))
    })?;

    info!("Logistic regression training completed successfully");

    Ok(FittedModel::new(
        n_features,
        FittedEstimator::LogisticRegression(model),
    ))
}

/// Validate training inputs and build the feature matrix
fn training_inputs(features: &[Vec<f64>], labels: &[Label]) -> Result<(DenseMatrix<f64>, usize)> {
    if features.is_empty() || labels.is_empty() {
        return Err(ModelHubError::TrainingFailure(
            "Features and targets cannot be empty".to_string(),
        ));
    }

    if features.len() != labels.len() {
        return Err(ModelHubError::TrainingFailure(format!(
            "Features and targets must have same number of samples: {} vs {}",
            features.len(),
            labels.len()
        )));
    }

    let matrix = feature_matrix(features).map_err(ModelHubError::TrainingFailure)?;
    Ok((matrix, features[0].len()))
}

/// Dense matrix from row-major features. Rejects ragged, empty or non-finite input.
pub(crate) fn feature_matrix(features: &[Vec<f64>]) -> std::result::Result<DenseMatrix<f64>, String> {
    let width = match features.first() {
        Some(row) if !row.is_empty() => row.len(),
        Some(_) => return Err("Feature rows cannot be empty".to_string()),
        None => return Err("Features cannot be empty".to_string()),
    };

    for (i, row) in features.iter().enumerate() {
        if row.len() != width {
            return Err(format!(
                "Ragged feature rows: row {i} has {} features, expected {width}",
                row.len()
            ));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(format!("Row {i} contains a non-finite value"));
        }
    }

    DenseMatrix::from_2d_vec(&features.to_vec()).map_err(|e| e.to_string())
}
