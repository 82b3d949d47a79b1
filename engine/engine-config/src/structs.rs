//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// These call the accessor functions from defaults module
// ============================================================================

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_count() -> usize {
    defaults::example_count()
}
fn d_break_threshold() -> f64 {
    defaults::break_threshold()
}
fn d_threshold_decay() -> f64 {
    defaults::threshold_decay()
}
fn d_max_retries() -> u32 {
    defaults::max_retries()
}
fn d_max_duplicates() -> u32 {
    defaults::max_duplicates()
}
fn d_lr() -> f64 {
    defaults::learning_rate()
}
fn d_cost_threshold() -> f64 {
    defaults::cost_threshold()
}
fn d_epochs() -> usize {
    defaults::epochs()
}
fn d_batch_size() -> usize {
    defaults::batch_size()
}
fn d_layers() -> Vec<usize> {
    defaults::layers().to_vec()
}
fn d_examples_dir() -> String {
    defaults::examples_dir().into()
}
fn d_weights_file() -> String {
    defaults::weights_file().into()
}
fn d_eval_games() -> u32 {
    defaults::eval_games()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// Self-play example generation
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of unique examples written per run
    #[serde(default = "d_count")]
    pub count: usize,
    /// Starting stop probability in percent (0-100)
    #[serde(default = "d_break_threshold")]
    pub break_threshold: f64,
    #[serde(default = "d_threshold_decay")]
    pub threshold_decay: f64,
    /// Discarded-game retries allowed per example before giving up
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    /// Consecutive duplicate examples tolerated before giving up
    #[serde(default = "d_max_duplicates")]
    pub max_duplicates: u32,
    /// Fixed RNG seed (None = seed from entropy)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: defaults::example_count(),
            break_threshold: defaults::break_threshold(),
            threshold_decay: defaults::threshold_decay(),
            max_retries: defaults::max_retries(),
            max_duplicates: defaults::max_duplicates(),
            seed: None,
        }
    }
}

/// Network training configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    #[serde(default = "d_lr")]
    pub learning_rate: f64,
    #[serde(default = "d_cost_threshold")]
    pub cost_threshold: f64,
    #[serde(default = "d_epochs")]
    pub epochs: usize,
    #[serde(default = "d_batch_size")]
    pub batch_size: usize,
    /// Neuron counts per layer, input first
    #[serde(default = "d_layers")]
    pub layers: Vec<usize>,
    #[serde(default = "d_examples_dir")]
    pub examples_dir: String,
    #[serde(default = "d_weights_file")]
    pub weights_file: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: defaults::learning_rate(),
            cost_threshold: defaults::cost_threshold(),
            epochs: defaults::epochs(),
            batch_size: defaults::batch_size(),
            layers: defaults::layers().to_vec(),
            examples_dir: defaults::examples_dir().into(),
            weights_file: defaults::weights_file().into(),
            seed: None,
        }
    }
}

/// Network-vs-random evaluation
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EvaluationConfig {
    #[serde(default = "d_eval_games")]
    pub games: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            games: defaults::eval_games(),
            seed: None,
        }
    }
}
