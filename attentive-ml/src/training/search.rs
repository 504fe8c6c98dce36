//! Cross-validated search over the RBM hidden-layer size.
//!
//! Every `(hidden size, fold)` cell trains fresh models on its own fold with
//! its own random stream, so cells run in any order (or in parallel on the
//! rayon pool) and still produce identical results.

use crate::config::{ClassifierConfig, RbmConfig, SearchConfig};
use crate::data::{Dataset, Fold, KFold};
use crate::error::MlError;
use crate::eval::ConfusionMatrix;
use crate::models::classifier;
use crate::training::pipeline::fit_rbm_classifier;
use crate::training::reproducibility::SeedManager;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Scores one grid cell: train on `train`, return accuracy on `validation`.
pub trait FoldEvaluator: Sync {
    fn evaluate_fold(
        &self,
        hidden: usize,
        fold: usize,
        train: &Dataset,
        validation: &Dataset,
        rng: &mut StdRng,
    ) -> Result<f64, MlError>;
}

/// Fresh RBM on the fold's train rows, features for both partitions, fresh
/// classifier on the train features, accuracy on the validation features.
#[derive(Debug, Clone, Default)]
pub struct RbmPipelineEvaluator {
    pub rbm: RbmConfig,
    pub classifier: ClassifierConfig,
}

impl RbmPipelineEvaluator {
    pub fn new(rbm: RbmConfig, classifier: ClassifierConfig) -> Self {
        Self { rbm, classifier }
    }
}

impl FoldEvaluator for RbmPipelineEvaluator {
    fn evaluate_fold(
        &self,
        hidden: usize,
        _fold: usize,
        train: &Dataset,
        validation: &Dataset,
        rng: &mut StdRng,
    ) -> Result<f64, MlError> {
        let fitted = fit_rbm_classifier(
            &train.features,
            &train.labels,
            hidden,
            &self.rbm,
            &self.classifier,
            rng,
        )?;
        let features = fitted.extract(&validation.features, rng)?;
        let predicted = classifier::predict(&fitted.classifier, &features)?;
        Ok(ConfusionMatrix::from_labels(&predicted, &validation.labels)?.accuracy())
    }
}

/// Per-fold validation accuracies of one candidate. `None` marks a failed fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub hidden: usize,
    pub fold_accuracies: Vec<Option<f64>>,
    /// Mean over the folds that completed; `None` if none did.
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl CandidateScore {
    pub fn from_folds(hidden: usize, fold_accuracies: Vec<Option<f64>>) -> Self {
        let completed: Vec<f64> = fold_accuracies.iter().flatten().copied().collect();
        let (mean, std) = if completed.is_empty() {
            (None, None)
        } else {
            let n = completed.len() as f64;
            let mean = completed.iter().sum::<f64>() / n;
            let variance = completed.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
            (Some(mean), Some(variance.sqrt()))
        };
        Self {
            hidden,
            fold_accuracies,
            mean,
            std,
        }
    }

    pub fn failed_folds(&self) -> usize {
        self.fold_accuracies.iter().filter(|a| a.is_none()).count()
    }
}

/// All candidates in grid order plus the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridResult {
    pub candidates: Vec<CandidateScore>,
    /// Index into `candidates` of the selected hidden size.
    pub selected: usize,
}

impl GridResult {
    /// Pick the highest mean. Exact ties go to the earliest candidate; candidates
    /// without any completed fold are never selected.
    pub fn from_candidates(candidates: Vec<CandidateScore>) -> Result<Self, MlError> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in candidates.iter().enumerate() {
            if let Some(mean) = c.mean
                && best.is_none_or(|(_, b)| mean > b)
            {
                best = Some((i, mean));
            }
        }
        let (selected, _) = best.ok_or_else(|| {
            MlError::training("every grid candidate failed on every fold; nothing to select")
        })?;
        Ok(Self {
            candidates,
            selected,
        })
    }

    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.selected]
    }

    pub fn selected_hidden(&self) -> usize {
        self.best().hidden
    }
}

/// Grid of hidden sizes crossed with a k-fold partition of the training rows.
#[derive(Debug, Clone)]
pub struct CrossValidationSearch {
    pub hidden_grid: Vec<usize>,
    pub folds: usize,
    pub seed: u64,
    pub parallel: bool,
}

impl CrossValidationSearch {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            hidden_grid: config.hidden_grid.clone(),
            folds: config.folds,
            seed: config.seed,
            parallel: config.parallel,
        }
    }

    /// Evaluate every cell and select a hidden size.
    ///
    /// A cell that returns an error is logged, recorded as `None` and left out
    /// of its candidate's mean. The search only fails when no candidate has a
    /// single completed fold.
    pub fn run<E: FoldEvaluator>(&self, data: &Dataset, evaluator: &E) -> Result<GridResult, MlError> {
        if self.hidden_grid.is_empty() {
            return Err(MlError::config("hidden size grid is empty"));
        }
        let folds = KFold::new(self.folds, self.seed).split(data.len())?;
        let seeds = SeedManager::new(self.seed);

        let cells: Vec<(usize, &Fold)> = self
            .hidden_grid
            .iter()
            .flat_map(|&hidden| folds.iter().map(move |fold| (hidden, fold)))
            .collect();
        info!(
            candidates = self.hidden_grid.len(),
            folds = self.folds,
            cells = cells.len(),
            parallel = self.parallel,
            "starting capacity search"
        );

        let run_cell = |&(hidden, fold): &(usize, &Fold)| -> Option<f64> {
            let train = data.select(&fold.train);
            let validation = data.select(&fold.validation);
            let mut rng = seeds.cell_stream(hidden, fold.index);
            match evaluator.evaluate_fold(hidden, fold.index, &train, &validation, &mut rng) {
                Ok(accuracy) => {
                    info!(hidden, fold = fold.index, accuracy, "grid cell complete");
                    Some(accuracy)
                }
                Err(e) => {
                    warn!(
                        hidden,
                        fold = fold.index,
                        error = %e,
                        "grid cell failed; excluded from the candidate mean"
                    );
                    None
                }
            }
        };

        let scores: Vec<Option<f64>> = if self.parallel {
            cells.par_iter().map(run_cell).collect()
        } else {
            cells.iter().map(run_cell).collect()
        };

        let candidates = self
            .hidden_grid
            .iter()
            .zip(scores.chunks(folds.len()))
            .map(|(&hidden, accs)| CandidateScore::from_folds(hidden, accs.to_vec()))
            .collect();
        let result = GridResult::from_candidates(candidates)?;
        let best = result.best();
        info!(
            hidden = best.hidden,
            mean_accuracy = best.mean,
            "capacity search selected hidden size"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn dataset(rows: usize) -> Dataset {
        let features = Array2::from_shape_fn((rows, 2), |(i, j)| (i * 2 + j) as f64);
        let labels = Array1::from_shape_fn(rows, |i| (i % 2) as f64);
        Dataset::new(vec!["a".into(), "b".into()], features, labels).unwrap()
    }

    /// Fixed accuracy per hidden size; optionally fails chosen cells.
    struct Scripted {
        accuracy: HashMap<usize, f64>,
        fail: Vec<(usize, usize)>,
    }

    impl Scripted {
        fn new(pairs: &[(usize, f64)]) -> Self {
            Self {
                accuracy: pairs.iter().copied().collect(),
                fail: Vec::new(),
            }
        }
    }

    impl FoldEvaluator for Scripted {
        fn evaluate_fold(
            &self,
            hidden: usize,
            fold: usize,
            _train: &Dataset,
            _validation: &Dataset,
            _rng: &mut StdRng,
        ) -> Result<f64, MlError> {
            if self.fail.contains(&(hidden, fold)) {
                return Err(MlError::unstable("scripted divergence"));
            }
            Ok(self.accuracy[&hidden] + fold as f64 * 0.001)
        }
    }

    fn search(grid: &[usize], parallel: bool) -> CrossValidationSearch {
        CrossValidationSearch {
            hidden_grid: grid.to_vec(),
            folds: 3,
            seed: 11,
            parallel,
        }
    }

    #[test]
    fn test_selects_best_regardless_of_grid_order() {
        let evaluator = Scripted::new(&[(32, 0.70), (64, 0.91), (128, 0.75), (256, 0.60)]);
        let orders: [&[usize]; 4] = [
            &[32, 64, 128, 256],
            &[256, 128, 64, 32],
            &[64, 32, 256, 128],
            &[128, 256, 32, 64],
        ];
        for order in orders {
            let result = search(order, false).run(&dataset(12), &evaluator).unwrap();
            assert_eq!(result.selected_hidden(), 64, "grid order {order:?}");
        }
    }

    #[test]
    fn test_exact_tie_keeps_first_candidate() {
        let evaluator = Scripted::new(&[(32, 0.8), (64, 0.7), (128, 0.8)]);
        let result = search(&[128, 64, 32], false).run(&dataset(12), &evaluator).unwrap();
        assert_eq!(result.selected_hidden(), 128);
        let result = search(&[32, 64, 128], false).run(&dataset(12), &evaluator).unwrap();
        assert_eq!(result.selected_hidden(), 32);
    }

    #[test]
    fn test_candidate_means_and_fold_layout() {
        let evaluator = Scripted::new(&[(8, 0.5), (16, 0.6)]);
        let result = search(&[8, 16], false).run(&dataset(9), &evaluator).unwrap();
        assert_eq!(result.candidates.len(), 2);
        let c = &result.candidates[1];
        assert_eq!(c.hidden, 16);
        assert_eq!(c.fold_accuracies.len(), 3);
        assert!((c.mean.unwrap() - 0.601).abs() < 1e-12);
        assert!(c.std.unwrap() > 0.0);
    }

    #[test]
    fn test_failed_fold_is_excluded_from_mean() {
        let mut evaluator = Scripted::new(&[(32, 0.8), (64, 0.9)]);
        evaluator.fail = vec![(64, 0)];
        let result = search(&[32, 64], false).run(&dataset(12), &evaluator).unwrap();
        let c = &result.candidates[1];
        assert_eq!(c.fold_accuracies[0], None);
        assert_eq!(c.failed_folds(), 1);
        // remaining folds 1 and 2
        assert!((c.mean.unwrap() - 0.9015).abs() < 1e-12);
        assert_eq!(result.selected_hidden(), 64);
    }

    #[test]
    fn test_fully_failed_candidate_is_not_selectable() {
        let mut evaluator = Scripted::new(&[(32, 0.6), (64, 0.99)]);
        evaluator.fail = (0..3).map(|f| (64, f)).collect();
        let result = search(&[64, 32], false).run(&dataset(12), &evaluator).unwrap();
        assert_eq!(result.candidates[0].mean, None);
        assert_eq!(result.selected_hidden(), 32);
    }

    #[test]
    fn test_all_candidates_failed_is_error() {
        let mut evaluator = Scripted::new(&[(32, 0.6)]);
        evaluator.fail = (0..3).map(|f| (32, f)).collect();
        let err = search(&[32], false).run(&dataset(12), &evaluator).unwrap_err();
        assert!(matches!(err, MlError::Training(_)));
    }

    #[test]
    fn test_too_few_rows_for_folds() {
        let evaluator = Scripted::new(&[(32, 0.6)]);
        assert!(search(&[32], false).run(&dataset(2), &evaluator).is_err());
    }

    #[test]
    fn test_rbm_evaluator_parallel_matches_sequential() {
        let features = Array2::from_shape_fn((30, 3), |(i, j)| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sign + ((i * 3 + j) as f64 * 0.7).sin() * 0.4
        });
        let labels = Array1::from_shape_fn(30, |i| if i % 2 == 0 { 1.0 } else { 0.0 });
        let data = Dataset::new(vec!["a".into(), "b".into(), "c".into()], features, labels).unwrap();
        let evaluator = RbmPipelineEvaluator::new(
            RbmConfig {
                epochs: 2,
                ..RbmConfig::default()
            },
            ClassifierConfig {
                epochs: 3,
                ..ClassifierConfig::default()
            },
        );

        let sequential = search(&[4, 8], false).run(&data, &evaluator).unwrap();
        let parallel = search(&[4, 8], true).run(&data, &evaluator).unwrap();
        assert_eq!(sequential, parallel);
        for c in &sequential.candidates {
            assert!(c.fold_accuracies.iter().all(|a| a.is_some_and(|v| (0.0..=1.0).contains(&v))));
        }
    }
}
