//! Training hyperparameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::trainer::TrainError;

/// Configuration for [`crate::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingConfig {
    /// Step size for gradient descent.
    pub learning_rate: f64,

    /// Training stops once an epoch's mean cross-entropy drops below this.
    pub cost_threshold: f64,

    /// Maximum number of passes over the example set.
    pub epochs: usize,

    /// Examples per parameter update. The last batch of an epoch may be smaller.
    pub batch_size: usize,

    /// Directory holding one JSON example per file.
    pub examples_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            cost_threshold: 0.1,
            epochs: 10_000,
            batch_size: 10,
            examples_dir: PathBuf::from("./data/examples"),
        }
    }
}

impl TrainingConfig {
    /// Small, fast config for tests.
    pub fn for_testing(examples_dir: impl Into<PathBuf>) -> Self {
        Self {
            learning_rate: 0.05,
            cost_threshold: 0.0,
            epochs: 5,
            batch_size: 4,
            examples_dir: examples_dir.into(),
        }
    }

    /// Builder pattern: set learning rate.
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Builder pattern: set cost threshold.
    pub fn with_cost_threshold(mut self, threshold: f64) -> Self {
        self.cost_threshold = threshold;
        self
    }

    /// Builder pattern: set epoch count.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Builder pattern: set batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Builder pattern: set examples directory.
    pub fn with_examples_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.examples_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainError::InvalidConfig(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !self.cost_threshold.is_finite() || self.cost_threshold < 0.0 {
            return Err(TrainError::InvalidConfig(format!(
                "cost threshold must be non-negative, got {}",
                self.cost_threshold
            )));
        }
        if self.epochs == 0 {
            return Err(TrainError::InvalidConfig("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(TrainError::InvalidConfig(
                "batch size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
