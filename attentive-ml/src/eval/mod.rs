//! Evaluation: classification metrics, ROC/AUC, baseline comparison.

pub mod comparison;
pub mod metrics;

pub use comparison::BaselineComparison;
pub use metrics::{
    ClassificationMetrics, ConfusionMatrix, EvaluationReport, RocPoint, auc_roc, evaluate,
    roc_curve,
};
