//! Classification Metrics
//!
//! Accuracy plus support-weighted precision and recall over the union of
//! labels seen in either sequence. Classes with no predictions (or no
//! support) contribute zero rather than failing.

use modelhub_databases::ClassificationMetrics;
use std::collections::HashMap;
use tracing::{debug, error, info};

use crate::ml_integration::metadata::Label;

/// Outcome of a scoring pass
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsReport {
    /// Metrics computed from the inputs
    Computed(ClassificationMetrics),
    /// Scoring failed; the metrics are all zero
    Degraded {
        metrics: ClassificationMetrics,
        reason: String,
    },
}

impl MetricsReport {
    /// The metric values, zeros when degraded
    pub fn metrics(&self) -> ClassificationMetrics {
        match self {
            MetricsReport::Computed(metrics) => *metrics,
            MetricsReport::Degraded { metrics, .. } => *metrics,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, MetricsReport::Degraded { .. })
    }
}

/// Score predictions against ground truth. Never fails.
pub fn calculate_metrics(y_true: &[Label], y_pred: &[Label]) -> MetricsReport {
    debug!("Calculating metrics for {} samples", y_true.len());

    match compute(y_true, y_pred) {
        Ok(metrics) => {
            info!(
                "Metrics calculated - Accuracy: {:.4}, Precision: {:.4}, Recall: {:.4}",
                metrics.accuracy, metrics.precision, metrics.recall
            );
            MetricsReport::Computed(metrics)
        }
        Err(reason) => {
            error!("Error calculating metrics: {reason}");
            MetricsReport::Degraded {
                metrics: ClassificationMetrics::zeros(),
                reason,
            }
        }
    }
}

#[derive(Default)]
struct LabelCounts {
    support: usize,
    predicted: usize,
    true_positive: usize,
}

fn compute(y_true: &[Label], y_pred: &[Label]) -> Result<ClassificationMetrics, String> {
    if y_true.len() != y_pred.len() {
        return Err(format!(
            "Found input variables with inconsistent numbers of samples: {} vs {}",
            y_true.len(),
            y_pred.len()
        ));
    }
    if y_true.is_empty() {
        return Err("Cannot score an empty set of predictions".to_string());
    }

    let mut counts: HashMap<Label, LabelCounts> = HashMap::new();
    let mut correct = 0usize;
    for (truth, pred) in y_true.iter().zip(y_pred) {
        counts.entry(*truth).or_default().support += 1;
        counts.entry(*pred).or_default().predicted += 1;
        if truth == pred {
            correct += 1;
            counts.entry(*truth).or_default().true_positive += 1;
        }
    }

    let total = y_true.len() as f64;
    let mut precision = 0.0;
    let mut recall = 0.0;
    for c in counts.values() {
        if c.support == 0 {
            continue;
        }
        let weight = c.support as f64;
        if c.predicted > 0 {
            precision += weight * c.true_positive as f64 / c.predicted as f64;
        }
        recall += weight * c.true_positive as f64 / c.support as f64;
    }

    Ok(ClassificationMetrics {
        accuracy: correct as f64 / total,
        precision: precision / total,
        recall: recall / total,
    })
}
