//! Error types for the attentive-ml crate.

use thiserror::Error;

/// Top-level error type for training, search, evaluation and inference.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl MlError {
    pub fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn unstable(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Fail with [`MlError::ShapeMismatch`] unless `actual == expected`.
pub fn ensure_width(context: &str, expected: usize, actual: usize) -> Result<(), MlError> {
    if expected != actual {
        return Err(MlError::shape(context, expected, actual));
    }
    Ok(())
}

/// Fail with [`MlError::NumericalInstability`] if any value is NaN or infinite.
pub fn ensure_finite<'a>(
    context: &str,
    values: impl IntoIterator<Item = &'a f64>,
) -> Result<(), MlError> {
    if let Some(bad) = values.into_iter().find(|v| !v.is_finite()) {
        return Err(MlError::unstable(format!(
            "{context} produced non-finite value {bad}"
        )));
    }
    Ok(())
}
