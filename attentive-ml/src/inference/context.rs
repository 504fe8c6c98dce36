//! Single-record prediction from a loaded artifact set.

use crate::error::{MlError, ensure_width};
use crate::inference::artifacts::ArtifactSet;
use crate::models::classifier::{self, DECISION_THRESHOLD};
use crate::models::rbm;
use ndarray::{ArrayView1, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome for one input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: bool,
    pub probability: f64,
    /// Features absent from the record that were filled with 0.0.
    pub defaulted_features: Vec<String>,
}

impl Prediction {
    pub fn label_text(&self) -> &'static str {
        if self.label { "ADHD" } else { "No ADHD" }
    }
}

/// Standardize, extract RBM hidden samples, classify, threshold.
///
/// Hidden features are sampled, so each call draws from a generator seeded
/// with `seed`; the same input always yields the same prediction.
#[derive(Debug, Clone)]
pub struct InferenceContext {
    artifacts: ArtifactSet,
    seed: u64,
    index: HashMap<String, usize>,
}

impl InferenceContext {
    pub fn new(artifacts: ArtifactSet, seed: u64) -> Result<Self, MlError> {
        artifacts.validate()?;
        let index = artifacts
            .feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Ok(Self {
            artifacts,
            seed,
            index,
        })
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifacts.feature_names
    }

    /// Predict from raw (unstandardized) values in training column order.
    pub fn predict_vector(&self, values: &[f64]) -> Result<Prediction, MlError> {
        ensure_width("inference input width", self.feature_names().len(), values.len())?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MlError::invalid_input("input contains a non-finite value"));
        }

        let scaled = self
            .artifacts
            .standardizer
            .transform_row(ArrayView1::from(values))?
            .insert_axis(Axis(0));
        let mut rng = StdRng::seed_from_u64(self.seed);
        let hidden = rbm::extract_features(&self.artifacts.rbm, &scaled, &mut rng)?;
        let probability = classifier::forward(&self.artifacts.classifier, &hidden)?[0];
        Ok(Prediction {
            label: probability >= DECISION_THRESHOLD,
            probability,
            defaulted_features: Vec::new(),
        })
    }

    /// Predict from named values.
    ///
    /// Missing features are filled with 0.0 before standardization, which is
    /// not neutral unless that feature's fitted mean is 0; each fill is logged
    /// and reported in [`Prediction::defaulted_features`]. Unknown names are
    /// rejected.
    pub fn predict_record(&self, record: &HashMap<String, f64>) -> Result<Prediction, MlError> {
        let mut unknown: Vec<&str> = record
            .keys()
            .filter(|k| !self.index.contains_key(*k))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(MlError::invalid_input(format!(
                "unknown features: {}",
                unknown.join(", ")
            )));
        }

        let mut defaulted = Vec::new();
        let values: Vec<f64> = self
            .feature_names()
            .iter()
            .map(|name| match record.get(name) {
                Some(v) => *v,
                None => {
                    defaulted.push(name.clone());
                    0.0
                }
            })
            .collect();
        if !defaulted.is_empty() {
            tracing::warn!(
                missing = defaulted.len(),
                features = ?defaulted,
                "missing features filled with 0.0; standardized values are shifted"
            );
        }

        let mut prediction = self.predict_vector(&values)?;
        prediction.defaulted_features = defaulted;
        Ok(prediction)
    }
}
