//! Inference: persisted artifacts and the prediction context built on them.

pub mod artifacts;
pub mod context;

pub use artifacts::{ARTIFACT_FILE, ArtifactManifest, ArtifactSet};
pub use context::{InferenceContext, Prediction};
