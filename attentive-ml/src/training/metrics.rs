//! Training metrics tracking.

use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Per-epoch loss history of one training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub epochs_completed: usize,
    pub loss_history: Vec<f64>,
    pub best_epoch: Option<usize>,
    pub best_loss: Option<f64>,
    pub total_training_time_secs: f64,
}

impl TrainingMetrics {
    /// Record the mean loss of a finished epoch. A non-finite loss is an error.
    pub fn record_epoch(&mut self, loss: f64) -> Result<(), MlError> {
        if !loss.is_finite() {
            return Err(MlError::unstable(format!(
                "epoch {} loss is {loss}",
                self.epochs_completed + 1
            )));
        }
        self.loss_history.push(loss);
        self.epochs_completed += 1;

        if self.best_loss.is_none_or(|best| loss < best) {
            self.best_loss = Some(loss);
            self.best_epoch = Some(self.epochs_completed);
        }
        Ok(())
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }
}
