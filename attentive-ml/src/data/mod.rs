//! Data handling: loading, stratified splitting, k-fold partitions, standardization.

pub mod dataset;
pub mod split;
pub mod standardize;

pub use dataset::Dataset;
pub use split::{Fold, KFold, train_test_split};
pub use standardize::Standardizer;
