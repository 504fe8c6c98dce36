//! Pipeline configuration.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit file -> environment.

use crate::error::MlError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dataset loading and splitting.
    #[serde(default)]
    pub data: DataConfig,
    /// Restricted Boltzmann machine training.
    #[serde(default)]
    pub rbm: RbmConfig,
    /// Feedforward classifier training.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Cross-validated capacity search.
    #[serde(default)]
    pub search: SearchConfig,
    /// Where trained artifacts are written.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Dataset loading and train/test split configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Name of the binary label column in the input file.
    #[serde(default = "default_label_column")]
    pub label_column: String,
    /// Fraction of rows held out as the test partition.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the stratified train/test shuffle.
    #[serde(default = "default_seed")]
    pub split_seed: u64,
    /// Field delimiter for CSV input.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            label_column: default_label_column(),
            test_fraction: default_test_fraction(),
            split_seed: default_seed(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_label_column() -> String {
    "is_adhd".to_string()
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_delimiter() -> char {
    ','
}

/// RBM training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RbmConfig {
    #[serde(default = "default_rbm_epochs")]
    pub epochs: usize,
    #[serde(default = "default_rbm_batch_size")]
    pub batch_size: usize,
    /// Declared step size. Updates are currently applied with an effective rate of 1.
    #[serde(default = "default_rbm_learning_rate")]
    pub learning_rate: f64,
    /// Standard deviation of the Gaussian weight initialisation.
    #[serde(default = "default_init_std")]
    pub init_std: f64,
}

impl Default for RbmConfig {
    fn default() -> Self {
        Self {
            epochs: default_rbm_epochs(),
            batch_size: default_rbm_batch_size(),
            learning_rate: default_rbm_learning_rate(),
            init_std: default_init_std(),
        }
    }
}

fn default_rbm_epochs() -> usize {
    10
}

fn default_rbm_batch_size() -> usize {
    10
}

fn default_rbm_learning_rate() -> f64 {
    0.1
}

fn default_init_std() -> f64 {
    0.01
}

/// Feedforward classifier training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_epochs")]
    pub epochs: usize,
    #[serde(default = "default_classifier_batch_size")]
    pub batch_size: usize,
    /// Adam step size.
    #[serde(default = "default_classifier_learning_rate")]
    pub learning_rate: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            epochs: default_classifier_epochs(),
            batch_size: default_classifier_batch_size(),
            learning_rate: default_classifier_learning_rate(),
        }
    }
}

fn default_classifier_epochs() -> usize {
    10
}

fn default_classifier_batch_size() -> usize {
    32
}

fn default_classifier_learning_rate() -> f64 {
    0.001
}

/// Capacity search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Candidate hidden-unit counts, searched in this order.
    #[serde(default = "default_hidden_grid")]
    pub hidden_grid: Vec<usize>,
    #[serde(default = "default_folds")]
    pub folds: usize,
    /// Seed for the fold shuffle and the per-cell random streams.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Run grid cells on the rayon thread pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hidden_grid: default_hidden_grid(),
            folds: default_folds(),
            seed: default_seed(),
            parallel: true,
        }
    }
}

fn default_hidden_grid() -> Vec<usize> {
    vec![32, 64, 128, 256, 512]
}

fn default_folds() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Artifact output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
        }
    }
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".attentive/artifacts")
}

impl PipelineConfig {
    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), MlError> {
        if self.search.hidden_grid.is_empty() {
            return Err(MlError::config("search.hidden_grid must not be empty"));
        }
        if self.search.hidden_grid.contains(&0) {
            return Err(MlError::config("search.hidden_grid entries must be > 0"));
        }
        if self.search.folds < 2 {
            return Err(MlError::config(format!(
                "search.folds must be at least 2, got {}",
                self.search.folds
            )));
        }
        if self.rbm.batch_size == 0 || self.classifier.batch_size == 0 {
            return Err(MlError::config("batch sizes must be > 0"));
        }
        if self.rbm.epochs == 0 || self.classifier.epochs == 0 {
            return Err(MlError::config("epoch counts must be > 0"));
        }
        if !(self.data.test_fraction > 0.0 && self.data.test_fraction < 1.0) {
            return Err(MlError::config(format!(
                "data.test_fraction must lie in (0, 1), got {}",
                self.data.test_fraction
            )));
        }
        if self.classifier.learning_rate.is_nan() || self.classifier.learning_rate <= 0.0 {
            return Err(MlError::config("classifier.learning_rate must be > 0"));
        }
        Ok(())
    }
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".attentive").join("config.toml")
}

/// Load configuration by layering defaults, config files and the environment.
///
/// Environment variables use the `ATTENTIVE_` prefix with `__` as the section
/// separator, e.g. `ATTENTIVE_SEARCH__FOLDS=3`.
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<PipelineConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));

    // User-level config
    if let Some(dirs) = directories::ProjectDirs::from("dev", "attentive", "attentive") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("ATTENTIVE_").split("__"));

    figment.extract().map_err(Box::new)
}
