//! # attentive-ml: RBM features, feedforward classification, capacity search
//!
//! Trains a restricted Boltzmann machine as an unsupervised feature extractor
//! over standardized tabular assessment scores, fits a small feedforward
//! classifier on the extracted hidden samples, and picks the RBM hidden size
//! by k-fold cross-validation. The winning pipeline is evaluated on a held-out
//! partition against a classifier trained directly on the standardized inputs.
//!
//! ## Layout
//!
//! - [`data`]: datasets, stratified and k-fold splits, standardization
//! - [`models`]: RBM and classifier parameters with their training math
//! - [`training`]: metrics, seed streams, the capacity search and full runs
//! - [`eval`]: classification metrics, ROC/AUC, baseline comparison
//! - [`inference`]: persisted artifacts and single-record prediction
//!
//! All randomness is explicit. Every sampling or shuffling call takes a
//! generator, and each search cell gets its own stream derived from the run
//! seed, so results are reproducible whether cells run in parallel or not.

// Foundation
pub mod config;
pub mod error;

pub mod data;
pub mod eval;
pub mod inference;
pub mod models;
pub mod training;

// Re-exports
pub use config::{PipelineConfig, load_config};
pub use data::Dataset;
pub use error::MlError;
pub use eval::{BaselineComparison, EvaluationReport};
pub use inference::{ArtifactSet, InferenceContext, Prediction};
pub use training::{CrossValidationSearch, GridResult, PipelineReport, run_pipeline};
