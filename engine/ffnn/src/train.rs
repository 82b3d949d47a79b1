//! Epoch loop over a directory of example files.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TrainingConfig;
use crate::example::{list_example_files, TrainingExample};
use crate::network::{cross_entropy, Network};
use crate::trainer::{TrainError, Trainer};

/// Why a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Mean cost fell below the configured threshold
    Converged,
    /// Every configured epoch ran without converging
    EpochsExhausted,
    /// The cancel flag was raised
    Cancelled,
}

/// Result of one completed epoch, passed to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub mean_cost: f64,
    pub examples: usize,
    pub batches: usize,
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Completed epochs
    pub epochs_run: usize,
    /// Example files found in the examples directory
    pub examples_per_epoch: usize,
    /// Mean cost of the last completed epoch
    pub final_cost: Option<f64>,
    pub stop_reason: StopReason,
}

/// Train `network` in place on the examples under `config.examples_dir`.
pub fn train<R: Rng + ?Sized>(
    network: &mut Network,
    config: &TrainingConfig,
    rng: &mut R,
    cancel: &AtomicBool,
) -> Result<TrainingReport, TrainError> {
    train_with_progress(network, config, rng, cancel, |_| {})
}

/// [`train`] with a callback after every completed epoch.
///
/// Per-epoch progress is only logged at debug level; callers that want it at
/// info level report it from `on_epoch`.
///
/// Each epoch shuffles the example files, then for every file runs a forward
/// and backward pass and flushes the gradients every `batch_size` examples,
/// plus once for a trailing partial batch. The cancel flag is checked before
/// each example; gradients accumulated so far are applied before returning.
pub fn train_with_progress<R, F>(
    network: &mut Network,
    config: &TrainingConfig,
    rng: &mut R,
    cancel: &AtomicBool,
    mut on_epoch: F,
) -> Result<TrainingReport, TrainError>
where
    R: Rng + ?Sized,
    F: FnMut(&EpochSummary),
{
    config.validate()?;

    let mut files = list_example_files(&config.examples_dir)?;
    if files.is_empty() {
        return Err(TrainError::NoExamples(config.examples_dir.clone()));
    }

    let inputs = network.input_size();
    let outputs = network.output_size();
    let mut trainer = Trainer::new(network);
    let mut report = TrainingReport {
        epochs_run: 0,
        examples_per_epoch: files.len(),
        final_cost: None,
        stop_reason: StopReason::EpochsExhausted,
    };

    info!(
        examples = files.len(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        learning_rate = config.learning_rate,
        "Starting training"
    );

    'epochs: for epoch in 0..config.epochs {
        files.shuffle(rng);

        let mut total_cost = 0.0;
        let mut processed = 0usize;
        let mut batches = 0usize;

        for path in &files {
            if cancel.load(Ordering::Relaxed) {
                let applied = trainer.flush(config.learning_rate);
                debug!(epoch, processed, applied, "Training cancelled");
                report.stop_reason = StopReason::Cancelled;
                break 'epochs;
            }

            let example = TrainingExample::load(path)?;
            example.check_shape(path, inputs, outputs)?;

            let predicted = trainer.forward_with_cache(&example.input)?;
            total_cost += cross_entropy(predicted, &example.target);
            trainer.backward(&example.target)?;
            processed += 1;

            if trainer.pending() == config.batch_size {
                let size = trainer.flush(config.learning_rate);
                batches += 1;
                debug!(epoch, batch_size = size, processed, "Completed batch");
            }
        }

        if trainer.pending() > 0 {
            let size = trainer.flush(config.learning_rate);
            batches += 1;
            debug!(epoch, batch_size = size, processed, "Completed partial batch");
        }

        let mean_cost = total_cost / processed as f64;
        report.epochs_run = epoch + 1;
        report.final_cost = Some(mean_cost);
        debug!(epoch, mean_cost, batches, "Epoch complete");
        on_epoch(&EpochSummary {
            epoch,
            mean_cost,
            examples: processed,
            batches,
        });

        if mean_cost < config.cost_threshold {
            debug!(
                mean_cost,
                threshold = config.cost_threshold,
                "Training converged"
            );
            report.stop_reason = StopReason::Converged;
            break;
        }
    }

    if report.stop_reason == StopReason::EpochsExhausted {
        debug!(epochs = report.epochs_run, "Training finished without reaching cost threshold");
    }

    Ok(report)
}
