//! Command line configuration for `t3`
//!
//! Defaults come from config.toml (with `T3_*` environment overrides applied
//! by the loader). CLI arguments take highest priority.

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

use engine_config::{load_config, CentralConfig};
use games_tictactoe::{INPUT_SIZE, NUM_CELLS};

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_data_dir() -> String {
    CENTRAL_CONFIG.common.data_dir.clone()
}

fn default_count() -> usize {
    CENTRAL_CONFIG.generator.count
}

fn default_break_threshold() -> f64 {
    CENTRAL_CONFIG.generator.break_threshold
}

fn default_threshold_decay() -> f64 {
    CENTRAL_CONFIG.generator.threshold_decay
}

fn default_max_retries() -> u32 {
    CENTRAL_CONFIG.generator.max_retries
}

fn default_max_duplicates() -> u32 {
    CENTRAL_CONFIG.generator.max_duplicates
}

fn default_examples_dir() -> String {
    CENTRAL_CONFIG.training.examples_dir.clone()
}

fn default_weights_file() -> String {
    CENTRAL_CONFIG.training.weights_file.clone()
}

fn default_layers() -> Vec<usize> {
    CENTRAL_CONFIG.training.layers.clone()
}

fn default_learning_rate() -> f64 {
    CENTRAL_CONFIG.training.learning_rate
}

fn default_cost_threshold() -> f64 {
    CENTRAL_CONFIG.training.cost_threshold
}

fn default_epochs() -> usize {
    CENTRAL_CONFIG.training.epochs
}

fn default_batch_size() -> usize {
    CENTRAL_CONFIG.training.batch_size
}

fn default_games() -> u32 {
    CENTRAL_CONFIG.evaluation.games
}

#[derive(Parser, Debug, Clone)]
#[command(name = "t3")]
#[command(about = "t3 - TicTacToe policy network trainer")]
#[command(
    long_about = "Generates oracle-labelled self-play positions, trains a small
feed-forward network on them and evaluates the result against a random player.

Configuration is loaded from config.toml with T3_* environment overrides.
CLI arguments take highest priority."
)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value_t = default_log_level())]
    pub log_level: String,

    /// Directory for run stats
    #[arg(long, global = true, default_value_t = default_data_dir())]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write oracle-labelled training examples
    Generate(GenerateArgs),
    /// Train a network on a directory of examples
    Train(TrainArgs),
    /// Play a trained network against a random opponent
    Evaluate(EvaluateArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Generate(_) => "generate",
            Command::Train(_) => "train",
            Command::Evaluate(_) => "evaluate",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output directory for example files
    #[arg(long, default_value_t = default_examples_dir())]
    pub out_dir: String,

    /// Number of examples to write
    #[arg(long, default_value_t = default_count())]
    pub count: usize,

    /// Starting stop threshold in percent
    #[arg(long, default_value_t = default_break_threshold())]
    pub break_threshold: f64,

    /// Threshold decay factor across the run
    #[arg(long, default_value_t = default_threshold_decay())]
    pub threshold_decay: f64,

    /// Discarded games allowed per example
    #[arg(long, default_value_t = default_max_retries())]
    pub max_retries: u32,

    /// Consecutive duplicates allowed per example
    #[arg(long, default_value_t = default_max_duplicates())]
    pub max_duplicates: u32,

    /// RNG seed (random if unset)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Directory of example files
    #[arg(long, default_value_t = default_examples_dir())]
    pub examples_dir: String,

    /// Where to write the trained weights
    #[arg(long, default_value_t = default_weights_file())]
    pub weights_file: String,

    /// Neuron counts per layer, input first
    #[arg(long, value_delimiter = ',', default_values_t = default_layers())]
    pub layers: Vec<usize>,

    #[arg(long, default_value_t = default_learning_rate())]
    pub learning_rate: f64,

    /// Stop once an epoch's mean cost drops below this
    #[arg(long, default_value_t = default_cost_threshold())]
    pub cost_threshold: f64,

    #[arg(long, default_value_t = default_epochs())]
    pub epochs: usize,

    #[arg(long, default_value_t = default_batch_size())]
    pub batch_size: usize,

    /// Continue from the existing weights file instead of fresh weights
    #[arg(long)]
    pub resume: bool,

    /// RNG seed for weights and shuffling (random if unset)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Weights file to evaluate
    #[arg(long, default_value_t = default_weights_file())]
    pub weights_file: String,

    /// Number of games to play
    #[arg(long, default_value_t = default_games())]
    pub games: u32,

    /// RNG seed for the random opponent (random if unset)
    #[arg(long)]
    pub seed: Option<u64>,
}

impl GenerateArgs {
    pub fn seed(&self) -> Option<u64> {
        self.seed.or(CENTRAL_CONFIG.generator.seed)
    }

    pub fn generator_config(&self) -> selfplay::GeneratorConfig {
        selfplay::GeneratorConfig::default()
            .with_break_threshold(self.break_threshold)
            .with_threshold_decay(self.threshold_decay)
            .with_max_retries(self.max_retries)
            .with_max_duplicates(self.max_duplicates)
    }
}

impl TrainArgs {
    pub fn seed(&self) -> Option<u64> {
        self.seed.or(CENTRAL_CONFIG.training.seed)
    }

    pub fn training_config(&self) -> ffnn::TrainingConfig {
        ffnn::TrainingConfig::default()
            .with_learning_rate(self.learning_rate)
            .with_cost_threshold(self.cost_threshold)
            .with_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_examples_dir(&self.examples_dir)
    }
}

impl EvaluateArgs {
    pub fn seed(&self) -> Option<u64> {
        self.seed.or(CENTRAL_CONFIG.evaluation.seed)
    }
}

impl Cli {
    pub fn validate(&self) -> Result<()> {
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        if self.data_dir.is_empty() {
            return Err(anyhow!("data_dir cannot be empty"));
        }

        match &self.command {
            Command::Generate(args) => args.validate(),
            Command::Train(args) => args.validate(),
            Command::Evaluate(args) => args.validate(),
        }
    }

    pub fn stats_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

impl GenerateArgs {
    fn validate(&self) -> Result<()> {
        if self.out_dir.is_empty() {
            return Err(anyhow!("out_dir cannot be empty"));
        }
        if self.count == 0 || self.count > selfplay::MAX_EXAMPLES {
            return Err(anyhow!(
                "count must be between 1 and {}, got {}",
                selfplay::MAX_EXAMPLES,
                self.count
            ));
        }
        if !(0.0..=100.0).contains(&self.break_threshold) {
            return Err(anyhow!(
                "break_threshold must be a percentage, got {}",
                self.break_threshold
            ));
        }
        if !self.threshold_decay.is_finite() || self.threshold_decay < 0.0 {
            return Err(anyhow!("threshold_decay must be non-negative"));
        }
        Ok(())
    }
}

impl TrainArgs {
    fn validate(&self) -> Result<()> {
        if self.examples_dir.is_empty() {
            return Err(anyhow!("examples_dir cannot be empty"));
        }
        if self.weights_file.is_empty() {
            return Err(anyhow!("weights_file cannot be empty"));
        }
        match (self.layers.first(), self.layers.last()) {
            (Some(&INPUT_SIZE), Some(&NUM_CELLS)) if self.layers.len() >= 2 => {}
            _ => {
                return Err(anyhow!(
                    "layers must start with {} and end with {}, got {:?}",
                    INPUT_SIZE,
                    NUM_CELLS,
                    self.layers
                ))
            }
        }
        if self.layers.contains(&0) {
            return Err(anyhow!("layers cannot contain zero-sized layers"));
        }
        self.training_config()
            .validate()
            .map_err(|e| anyhow!("{}", e))
    }
}

impl EvaluateArgs {
    fn validate(&self) -> Result<()> {
        if self.weights_file.is_empty() {
            return Err(anyhow!("weights_file cannot be empty"));
        }
        if self.games == 0 {
            return Err(anyhow!("games must be greater than 0"));
        }
        Ok(())
    }
}
