//! Binary classification metrics and the ROC curve.

use crate::error::{MlError, ensure_finite, ensure_width};
use crate::models::classifier::decide;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// 2x2 confusion counts with label 1 as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tn: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(predicted: &Array1<f64>, actual: &Array1<f64>) -> Result<Self, MlError> {
        ensure_width("confusion matrix rows", actual.len(), predicted.len())?;
        let mut m = Self::default();
        for (p, a) in predicted.iter().zip(actual.iter()) {
            match (*p == 1.0, *a == 1.0) {
                (true, true) => m.tp += 1,
                (true, false) => m.fp += 1,
                (false, true) => m.fn_ += 1,
                (false, false) => m.tn += 1,
            }
        }
        Ok(m)
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.fn_ + self.tn
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// TP / (TP + FP), or 0 with no positive predictions.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// TP / (TP + FN), or 0 with no positive labels.
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Summary scores for one evaluated partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// `None` when the labels contain a single class.
    pub auc_roc: Option<f64>,
}

/// One ROC vertex. The first point uses an infinite threshold (nothing predicted positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    pub threshold: f64,
}

/// ROC curve swept over every distinct probability, highest first.
pub fn roc_curve(probabilities: &Array1<f64>, labels: &Array1<f64>) -> Result<Vec<RocPoint>, MlError> {
    ensure_width("roc curve rows", labels.len(), probabilities.len())?;
    ensure_finite("roc scores", probabilities.iter())?;
    let positives = labels.iter().filter(|y| **y == 1.0).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(MlError::evaluation(
            "ROC curve is undefined when only one class is present",
        ));
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

    let mut points = vec![RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    }];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = probabilities[order[i]];
        // rows sharing a score cross the threshold together
        while i < order.len() && probabilities[order[i]] == threshold {
            if labels[order[i]] == 1.0 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            fpr: fp as f64 / negatives as f64,
            tpr: tp as f64 / positives as f64,
            threshold,
        });
    }
    Ok(points)
}

/// Trapezoidal area under the ROC curve.
pub fn auc_roc(probabilities: &Array1<f64>, labels: &Array1<f64>) -> Result<f64, MlError> {
    Ok(trapezoid(&roc_curve(probabilities, labels)?))
}

fn trapezoid(points: &[RocPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum()
}

/// Everything computed for one set of predictions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub metrics: ClassificationMetrics,
    pub confusion: ConfusionMatrix,
    pub roc: Vec<RocPoint>,
}

/// Threshold probabilities at 0.5 and score them against `labels`.
pub fn evaluate(probabilities: &Array1<f64>, labels: &Array1<f64>) -> Result<EvaluationReport, MlError> {
    ensure_width("evaluation rows", labels.len(), probabilities.len())?;
    if labels.is_empty() {
        return Err(MlError::evaluation("nothing to evaluate"));
    }
    let confusion = ConfusionMatrix::from_labels(&decide(probabilities), labels)?;

    let (roc, auc) = match roc_curve(probabilities, labels) {
        Ok(roc) => {
            let auc = trapezoid(&roc);
            (roc, Some(auc))
        }
        Err(MlError::Evaluation(reason)) => {
            tracing::warn!(%reason, "AUC not computed");
            (Vec::new(), None)
        }
        Err(e) => return Err(e),
    };

    Ok(EvaluationReport {
        metrics: ClassificationMetrics {
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1_score: confusion.f1(),
            auc_roc: auc,
        },
        confusion,
        roc,
    })
}
