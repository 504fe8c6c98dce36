//! RBM pipeline versus the classifier-only baseline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Test accuracies of both pipelines and whether the RBM path strictly wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub rbm_accuracy: f64,
    pub baseline_accuracy: f64,
    /// `rbm_accuracy > baseline_accuracy`; equal accuracies are not an improvement.
    pub improved: bool,
}

impl BaselineComparison {
    pub fn new(rbm_accuracy: f64, baseline_accuracy: f64) -> Self {
        Self {
            rbm_accuracy,
            baseline_accuracy,
            improved: rbm_accuracy > baseline_accuracy,
        }
    }

    pub fn delta(&self) -> f64 {
        self.rbm_accuracy - self.baseline_accuracy
    }
}

impl fmt::Display for BaselineComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.improved {
            write!(
                f,
                "RBM features improve accuracy by {:.4} ({:.4} vs {:.4})",
                self.delta(),
                self.rbm_accuracy,
                self.baseline_accuracy
            )
        } else {
            write!(
                f,
                "no improvement from RBM features ({:.4} vs baseline {:.4})",
                self.rbm_accuracy, self.baseline_accuracy
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_improvement() {
        let c = BaselineComparison::new(0.9, 0.85);
        assert!(c.improved);
        assert!((c.delta() - 0.05).abs() < 1e-12);
        assert!(c.to_string().starts_with("RBM features improve"));
    }

    #[test]
    fn test_tie_is_no_improvement() {
        let c = BaselineComparison::new(0.875, 0.875);
        assert!(!c.improved);
        assert!(c.to_string().starts_with("no improvement"));
    }

    #[test]
    fn test_worse_is_no_improvement() {
        assert!(!BaselineComparison::new(0.7, 0.8).improved);
    }
}
