//! Estimator Configuration and Fitted Models
//!
//! Each model family has a typed configuration parsed from the normalized
//! hyperparameter map. Unknown keys and out-of-domain values are rejected
//! before any fitting happens.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::LogisticRegression;
use tracing::{debug, info};

use crate::error::{ModelHubError, Result};
use crate::ml_integration::metadata::Label;
use crate::ml_integration::model_management::ModelFamily;
use crate::ml_integration::trainer::supervised::{
    feature_matrix, train_logistic_regression, train_random_forest,
};
use modelhub_databases::ParamMap;

pub(crate) type Forest = RandomForestClassifier<f64, Label, DenseMatrix<f64>, Vec<Label>>;
pub(crate) type Logit = LogisticRegression<f64, Label, DenseMatrix<f64>, Vec<Label>>;

const RANDOM_FOREST_KEYS: &[&str] = &[
    "n_estimators",
    "max_depth",
    "random_state",
    "min_samples_split",
    "min_samples_leaf",
    "criterion",
    "max_features",
];
const LOGISTIC_REGRESSION_KEYS: &[&str] = &["C", "solver", "max_iter"];

/// Split quality measure for forest trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
}

/// Optimizer used by logistic regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    #[default]
    Lbfgs,
}

/// Random forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestConfig {
    /// Number of trees
    pub n_estimators: u16,
    /// Maximum tree depth, unlimited when `None`
    pub max_depth: Option<u16>,
    /// Seed for bootstrap sampling and feature selection
    pub random_state: u64,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required at a leaf
    pub min_samples_leaf: usize,
    /// Split criterion
    pub criterion: Criterion,
    /// Features considered per split, `sqrt(n_features)` when `None`
    pub max_features: Option<usize>,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            random_state: 0,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            max_features: None,
        }
    }
}

/// Logistic regression configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionConfig {
    /// Inverse regularization strength
    pub c: f64,
    /// Optimizer
    pub solver: Solver,
    /// Iteration budget requested by the client
    pub max_iter: u32,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            solver: Solver::Lbfgs,
            max_iter: 100,
        }
    }
}

impl LogisticRegressionConfig {
    /// L2 penalty strength handed to the optimizer
    pub fn alpha(&self) -> f64 {
        1.0 / self.c
    }
}

/// Typed configuration for one model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum EstimatorConfig {
    RandomForest(RandomForestConfig),
    LogisticRegression(LogisticRegressionConfig),
}

impl EstimatorConfig {
    /// Build the configuration for `family` from normalized params
    pub fn from_params(family: ModelFamily, params: &ParamMap) -> Result<Self> {
        debug!("Building {family} configuration from {} params", params.len());

        let config = match family {
            ModelFamily::RandomForest => {
                reject_unknown(family, params, RANDOM_FOREST_KEYS)?;
                let defaults = RandomForestConfig::default();

                let n_estimators = match int_param(params, "n_estimators", 1)? {
                    Some(n) => narrow::<u16>("n_estimators", n)?,
                    None => defaults.n_estimators,
                };
                let max_depth = nullable_int_param(params, "max_depth", 1)?
                    .map(|d| narrow::<u16>("max_depth", d))
                    .transpose()?;
                let random_state =
                    nullable_int_param(params, "random_state", 0)?.unwrap_or(defaults.random_state);
                let min_samples_split = int_param(params, "min_samples_split", 2)?
                    .map(|n| narrow::<usize>("min_samples_split", n))
                    .transpose()?
                    .unwrap_or(defaults.min_samples_split);
                let min_samples_leaf = int_param(params, "min_samples_leaf", 1)?
                    .map(|n| narrow::<usize>("min_samples_leaf", n))
                    .transpose()?
                    .unwrap_or(defaults.min_samples_leaf);
                let criterion = match str_param(params, "criterion")? {
                    None => defaults.criterion,
                    Some("gini") => Criterion::Gini,
                    Some("entropy") => Criterion::Entropy,
                    Some(other) => {
                        return Err(invalid(format!(
                            "criterion must be \"gini\" or \"entropy\", got \"{other}\""
                        )))
                    }
                };
                let max_features = nullable_int_param(params, "max_features", 1)?
                    .map(|n| narrow::<usize>("max_features", n))
                    .transpose()?;

                EstimatorConfig::RandomForest(RandomForestConfig {
                    n_estimators,
                    max_depth,
                    random_state,
                    min_samples_split,
                    min_samples_leaf,
                    criterion,
                    max_features,
                })
            }
            ModelFamily::LogisticRegression => {
                reject_unknown(family, params, LOGISTIC_REGRESSION_KEYS)?;
                let defaults = LogisticRegressionConfig::default();

                let c = match params.get("C") {
                    None => defaults.c,
                    Some(value) => match value.as_f64() {
                        Some(c) if c > 0.0 && c.is_finite() => c,
                        _ => return Err(invalid(format!("C must be a positive number, got {value}"))),
                    },
                };
                let solver = match str_param(params, "solver")? {
                    None | Some("lbfgs") => Solver::Lbfgs,
                    Some(other) => {
                        return Err(invalid(format!(
                            "solver must be \"lbfgs\", got \"{other}\""
                        )))
                    }
                };
                let max_iter = match int_param(params, "max_iter", 1)? {
                    Some(n) => narrow::<u32>("max_iter", n)?,
                    None => defaults.max_iter,
                };

                EstimatorConfig::LogisticRegression(LogisticRegressionConfig { c, solver, max_iter })
            }
        };

        info!("Estimator configuration accepted: {:?}", config);
        Ok(config)
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            EstimatorConfig::RandomForest(_) => ModelFamily::RandomForest,
            EstimatorConfig::LogisticRegression(_) => ModelFamily::LogisticRegression,
        }
    }

    /// Fit an estimator on `features` and `labels`
    pub fn fit(&self, features: &[Vec<f64>], labels: &[Label]) -> Result<FittedModel> {
        match self {
            EstimatorConfig::RandomForest(config) => train_random_forest(features, labels, config),
            EstimatorConfig::LogisticRegression(config) => {
                train_logistic_regression(features, labels, config)
            }
        }
    }
}

/// Fitted estimator state
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "family", content = "state", rename_all = "snake_case")]
pub(crate) enum FittedEstimator {
    RandomForest(Forest),
    LogisticRegression(Logit),
}

/// A trained model together with the input width it was fitted on
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedModel {
    n_features: usize,
    estimator: FittedEstimator,
}

impl FittedModel {
    pub(crate) fn new(n_features: usize, estimator: FittedEstimator) -> Self {
        Self {
            n_features,
            estimator,
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self.estimator {
            FittedEstimator::RandomForest(_) => ModelFamily::RandomForest,
            FittedEstimator::LogisticRegression(_) => ModelFamily::LogisticRegression,
        }
    }

    /// Number of features each input row must have
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Predict one label per row, in row order
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Label>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        if let Some((row, width)) = features
            .iter()
            .enumerate()
            .map(|(i, r)| (i, r.len()))
            .find(|(_, width)| *width != self.n_features)
        {
            return Err(ModelHubError::PredictionFailure(format!(
                "row {row} has {width} features, model expects {}",
                self.n_features
            )));
        }

        let matrix = feature_matrix(features).map_err(ModelHubError::PredictionFailure)?;

        let predictions = match &self.estimator {
            FittedEstimator::RandomForest(model) => model.predict(&matrix),
            FittedEstimator::LogisticRegression(model) => model.predict(&matrix),
        }
        .map_err(|e| ModelHubError::PredictionFailure(e.to_string()))?;

        debug!("Predicted {} rows with {}", predictions.len(), self.family());
        Ok(predictions)
    }
}

fn invalid(message: String) -> ModelHubError {
    ModelHubError::InvalidHyperparameters(message)
}

fn reject_unknown(family: ModelFamily, params: &ParamMap, accepted: &[&str]) -> Result<()> {
    let unknown: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|key| !accepted.contains(key))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(invalid(format!(
            "unknown parameter(s) for {family}: {}",
            unknown.join(", ")
        )))
    }
}

/// Absent -> `None`. Present values must be integers >= `min`.
fn int_param(params: &ParamMap, key: &str, min: u64) -> Result<Option<u64>> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => match value.as_u64() {
            Some(n) if n >= min => Ok(Some(n)),
            _ => Err(invalid(format!(
                "{key} must be an integer >= {min}, got {value}"
            ))),
        },
    }
}

/// Like [`int_param`] but `null` is accepted and treated as absent.
fn nullable_int_param(params: &ParamMap, key: &str, min: u64) -> Result<Option<u64>> {
    match params.get(key) {
        Some(Value::Null) => Ok(None),
        _ => int_param(params, key, min),
    }
}

fn str_param<'a>(params: &'a ParamMap, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(value) => Err(invalid(format!("{key} must be a string, got {value}"))),
    }
}

fn narrow<T: TryFrom<u64>>(key: &str, value: u64) -> Result<T> {
    T::try_from(value).map_err(|_| invalid(format!("{key} is out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> ParamMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

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

    fn separable() -> (Vec<Vec<f64>>, Vec<Label>) {
        (
            vec![
                vec![0.0, 0.1],
                vec![0.2, 0.0],
                vec![0.1, 0.3],
                vec![5.0, 5.1],
                vec![5.2, 4.9],
                vec![4.8, 5.3],
            ],
            vec![0, 0, 0, 1, 1, 1],
        )
    }

    #[test]
    fn test_random_forest_defaults() {
        let config = EstimatorConfig::from_params(ModelFamily::RandomForest, &ParamMap::new()).unwrap();
        assert_eq!(config, EstimatorConfig::RandomForest(RandomForestConfig::default()));
    }

    #[test]
    fn test_random_forest_schema() {
        let config = EstimatorConfig::from_params(
            ModelFamily::RandomForest,
            &params(json!({
                "n_estimators": 10,
                "max_depth": 3,
                "random_state": null,
                "criterion": "entropy",
                "max_features": 1
            })),
        )
        .unwrap();

        match config {
            EstimatorConfig::RandomForest(rf) => {
                assert_eq!(rf.n_estimators, 10);
                assert_eq!(rf.max_depth, Some(3));
                assert_eq!(rf.random_state, 0);
                assert_eq!(rf.criterion, Criterion::Entropy);
                assert_eq!(rf.max_features, Some(1));
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_random_forest_values() {
        for bad in [
            json!({"n_estimators": 0}),
            json!({"n_estimators": 2.5}),
            json!({"n_estimators": "ten"}),
            json!({"n_estimators": 70000}),
            json!({"max_depth": 0}),
            json!({"min_samples_split": 1}),
            json!({"criterion": "mse"}),
            json!({"random_state": -1}),
            json!({"bogus": 1}),
        ] {
            let result = EstimatorConfig::from_params(ModelFamily::RandomForest, &params(bad.clone()));
            assert!(
                matches!(result, Err(ModelHubError::InvalidHyperparameters(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_logistic_regression_schema() {
        let config = EstimatorConfig::from_params(
            ModelFamily::LogisticRegression,
            &params(json!({"C": 0.5, "solver": "lbfgs", "max_iter": 200})),
        )
        .unwrap();

        match config {
            EstimatorConfig::LogisticRegression(lr) => {
                assert_eq!(lr.c, 0.5);
                assert_eq!(lr.alpha(), 2.0);
                assert_eq!(lr.max_iter, 200);
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_logistic_regression_values() {
        for bad in [
            json!({"C": 0}),
            json!({"C": -1.0}),
            json!({"C": "strong"}),
            json!({"solver": "liblinear"}),
            json!({"max_iter": 0}),
            json!({"n_estimators": 10}),
        ] {
            let result =
                EstimatorConfig::from_params(ModelFamily::LogisticRegression, &params(bad.clone()));
            assert!(
                matches!(result, Err(ModelHubError::InvalidHyperparameters(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_random_forest_fit_and_predict() {
        let (x, y) = xor();
        let config = EstimatorConfig::RandomForest(RandomForestConfig {
            n_estimators: 10,
            max_depth: Some(3),
            ..RandomForestConfig::default()
        });

        let model = config.fit(&x, &y).unwrap();
        assert_eq!(model.family(), ModelFamily::RandomForest);
        assert_eq!(model.n_features(), 2);

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 4);
        assert!(predictions.iter().all(|p| *p == 0 || *p == 1));
    }

    #[test]
    fn test_logistic_regression_separable() {
        let (x, y) = separable();
        let config = EstimatorConfig::LogisticRegression(LogisticRegressionConfig::default());

        let model = config.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_logistic_regression_single_class() {
        let (x, _) = separable();
        let y = vec![1; x.len()];
        let config = EstimatorConfig::LogisticRegression(LogisticRegressionConfig::default());

        assert!(matches!(
            config.fit(&x, &y),
            Err(ModelHubError::TrainingFailure(_))
        ));
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = separable();
        let model = EstimatorConfig::LogisticRegression(LogisticRegressionConfig::default())
            .fit(&x, &y)
            .unwrap();

        let result = model.predict(&[vec![1.0, 2.0, 3.0]]);
        assert!(matches!(result, Err(ModelHubError::PredictionFailure(_))));
        assert!(model.predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_fitted_model_serde() {
        let (x, y) = xor();
        let model = EstimatorConfig::RandomForest(RandomForestConfig {
            n_estimators: 5,
            ..RandomForestConfig::default()
        })
        .fit(&x, &y)
        .unwrap();

        let bytes = serde_json::to_vec(&model).unwrap();
        let restored: FittedModel = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }
}
