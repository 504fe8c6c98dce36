//! Train/test and k-fold partitioning of row indices.

use crate::data::dataset::Dataset;
use crate::error::MlError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// One train/validation partition of a k-fold split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// k-fold splitter.
///
/// Validation chunks are contiguous runs of the (optionally shuffled) index
/// order; the first `n % n_splits` folds take one extra row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self {
            n_splits,
            shuffle: true,
            seed,
        }
    }

    pub fn split(&self, n: usize) -> Result<Vec<Fold>, MlError> {
        if self.n_splits < 2 {
            return Err(MlError::invalid_input(format!(
                "k-fold needs at least 2 splits, got {}",
                self.n_splits
            )));
        }
        if n < self.n_splits {
            return Err(MlError::invalid_input(format!(
                "cannot split {n} rows into {} folds",
                self.n_splits
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed);
            order.shuffle(&mut rng);
        }

        let base = n / self.n_splits;
        let extra = n % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for index in 0..self.n_splits {
            let size = base + usize::from(index < extra);
            let end = start + size;
            let validation = order[start..end].to_vec();
            let train = order[..start]
                .iter()
                .chain(order[end..].iter())
                .copied()
                .collect();
            folds.push(Fold {
                index,
                train,
                validation,
            });
            start = end;
        }
        Ok(folds)
    }
}

/// Stratified shuffle split: each class sends `round(count * test_fraction)`
/// rows to the test partition.
///
/// Returns `(train, test)` row indices, each sorted ascending.
pub fn train_test_split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), MlError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MlError::invalid_input(format!(
            "test fraction must lie in (0, 1), got {test_fraction}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in [0.0, 1.0] {
        let mut members: Vec<usize> = dataset
            .labels
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(&mut rng);
        let n_test = (members.len() as f64 * test_fraction).round() as usize;
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(MlError::dataset(format!(
            "split of {} rows at fraction {test_fraction} leaves an empty partition",
            dataset.len()
        )));
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}
