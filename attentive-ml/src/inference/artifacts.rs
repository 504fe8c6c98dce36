//! Trained artifact set: standardizer, RBM and classifier of the winning run.

use crate::data::Standardizer;
use crate::error::{MlError, ensure_width};
use crate::models::{ClassifierParams, RbmParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const ARTIFACT_FILE: &str = "artifacts.json";

/// Provenance of an artifact set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub hidden_size: usize,
    pub input_width: usize,
    pub test_accuracy: f64,
    /// Hex sha256 of the serialized parameters.
    pub digest: String,
}

/// Everything inference needs, with mutually consistent dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSet {
    pub feature_names: Vec<String>,
    pub standardizer: Standardizer,
    pub rbm: RbmParams,
    pub classifier: ClassifierParams,
    pub manifest: ArtifactManifest,
}

#[derive(Serialize)]
struct Payload<'a> {
    feature_names: &'a [String],
    standardizer: &'a Standardizer,
    rbm: &'a RbmParams,
    classifier: &'a ClassifierParams,
}

impl ArtifactSet {
    pub fn new(
        feature_names: Vec<String>,
        standardizer: Standardizer,
        rbm: RbmParams,
        classifier: ClassifierParams,
        test_accuracy: f64,
    ) -> Result<Self, MlError> {
        let mut set = Self {
            manifest: ArtifactManifest {
                run_id: uuid::Uuid::new_v4().to_string(),
                created_at: Utc::now(),
                hidden_size: rbm.hidden(),
                input_width: standardizer.width(),
                test_accuracy,
                digest: String::new(),
            },
            feature_names,
            standardizer,
            rbm,
            classifier,
        };
        set.validate()?;
        set.manifest.digest = set.compute_digest()?;
        Ok(set)
    }

    /// Check every dimension the inference path relies on.
    pub fn validate(&self) -> Result<(), MlError> {
        let width = self.standardizer.width();
        ensure_width("artifact feature names", width, self.feature_names.len())?;
        ensure_width("standardizer scale", width, self.standardizer.scale.len())?;
        ensure_width("rbm visible width", width, self.rbm.visible())?;
        self.rbm.validate()?;
        ensure_width("classifier input width", self.rbm.hidden(), self.classifier.input_width())?;
        self.classifier.validate()?;
        ensure_width("manifest hidden size", self.rbm.hidden(), self.manifest.hidden_size)?;
        ensure_width("manifest input width", width, self.manifest.input_width)
    }

    fn compute_digest(&self) -> Result<String, MlError> {
        let payload = Payload {
            feature_names: &self.feature_names,
            standardizer: &self.standardizer,
            rbm: &self.rbm,
            classifier: &self.classifier,
        };
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&payload)?);
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(ARTIFACT_FILE)
    }

    /// Write `artifacts.json` under `dir`: a `.tmp` sibling, then rename.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, MlError> {
        std::fs::create_dir_all(dir)?;
        let path = Self::path_in(dir);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, &path)?;
        tracing::info!(path = %path.display(), run_id = %self.manifest.run_id, "artifacts saved");
        Ok(path)
    }

    /// Read and verify an artifact set written by [`ArtifactSet::save`].
    pub fn load(dir: &Path) -> Result<Self, MlError> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Err(MlError::not_found(format!(
                "no artifacts at {}",
                path.display()
            )));
        }
        let set: Self = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        set.validate()?;
        let digest = set.compute_digest()?;
        if digest != set.manifest.digest {
            return Err(MlError::artifact(format!(
                "digest mismatch for {}: manifest {}, contents {digest}",
                path.display(),
                set.manifest.digest
            )));
        }
        Ok(set)
    }
}
