//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so every binary agrees on
//! the same values without shipping the file alongside it.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    generator: GeneratorDefaults,
    training: TrainingDefaults,
    evaluation: EvaluationDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct GeneratorDefaults {
    count: usize,
    break_threshold: f64,
    threshold_decay: f64,
    max_retries: u32,
    max_duplicates: u32,
}

#[derive(Debug, Deserialize)]
struct TrainingDefaults {
    learning_rate: f64,
    cost_threshold: f64,
    epochs: usize,
    batch_size: usize,
    layers: Vec<usize>,
    examples_dir: String,
    weights_file: String,
}

#[derive(Debug, Deserialize)]
struct EvaluationDefaults {
    games: u32,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Generator
pub fn example_count() -> usize {
    DEFAULTS.generator.count
}
pub fn break_threshold() -> f64 {
    DEFAULTS.generator.break_threshold
}
pub fn threshold_decay() -> f64 {
    DEFAULTS.generator.threshold_decay
}
pub fn max_retries() -> u32 {
    DEFAULTS.generator.max_retries
}
pub fn max_duplicates() -> u32 {
    DEFAULTS.generator.max_duplicates
}

// Training
pub fn learning_rate() -> f64 {
    DEFAULTS.training.learning_rate
}
pub fn cost_threshold() -> f64 {
    DEFAULTS.training.cost_threshold
}
pub fn epochs() -> usize {
    DEFAULTS.training.epochs
}
pub fn batch_size() -> usize {
    DEFAULTS.training.batch_size
}
pub fn layers() -> &'static [usize] {
    &DEFAULTS.training.layers
}
pub fn examples_dir() -> &'static str {
    &DEFAULTS.training.examples_dir
}
pub fn weights_file() -> &'static str {
    &DEFAULTS.training.weights_file
}

// Evaluation
pub fn eval_games() -> u32 {
    DEFAULTS.evaluation.games
}
