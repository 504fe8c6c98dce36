//! Training infrastructure: metrics, seeding, capacity search, full pipeline runs.

pub mod metrics;
pub mod pipeline;
pub mod reproducibility;
pub mod search;

pub use metrics::TrainingMetrics;
pub use pipeline::{FittedModel, PipelineReport, fit_rbm_classifier, run_pipeline};
pub use reproducibility::SeedManager;
pub use search::{
    CandidateScore, CrossValidationSearch, FoldEvaluator, GridResult, RbmPipelineEvaluator,
};
