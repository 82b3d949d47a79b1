//! Run statistics persistence.
//!
//! Each command writes a summary of its last run to
//! `<data_dir>/<command>_stats.json` for dashboards to pick up.

use anyhow::{Context, Result};
use ffnn::{StopReason, TrainingReport};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::evaluate::EvaluationSummary;

/// Per-command details of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RunDetails {
    Generate {
        out_dir: String,
        requested: usize,
        written: usize,
        duplicates: u64,
        cancelled: bool,
    },
    Train {
        weights_file: String,
        epochs_run: usize,
        examples_per_epoch: usize,
        final_cost: Option<f64>,
        stop_reason: StopReason,
    },
    Evaluate {
        weights_file: String,
        #[serde(flatten)]
        summary: EvaluationSummary,
        agreement: f64,
        optimal_rate: f64,
    },
}

impl RunDetails {
    pub fn command(&self) -> &'static str {
        match self {
            RunDetails::Generate { .. } => "generate",
            RunDetails::Train { .. } => "train",
            RunDetails::Evaluate { .. } => "evaluate",
        }
    }

    pub fn train(weights_file: &str, report: &TrainingReport) -> Self {
        RunDetails::Train {
            weights_file: weights_file.to_string(),
            epochs_run: report.epochs_run,
            examples_per_epoch: report.examples_per_epoch,
            final_cost: report.final_cost,
            stop_reason: report.stop_reason,
        }
    }

    pub fn evaluate(weights_file: &str, summary: EvaluationSummary) -> Self {
        RunDetails::Evaluate {
            weights_file: weights_file.to_string(),
            agreement: summary.agreement(),
            optimal_rate: summary.optimal_rate(),
            summary,
        }
    }
}

/// Serializable stats for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub timestamp: u64,
    pub runtime_seconds: f64,
    #[serde(flatten)]
    pub details: RunDetails,
}

impl RunStats {
    pub fn new(started: Instant, details: RunDetails) -> Self {
        Self {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            runtime_seconds: started.elapsed().as_secs_f64(),
            details,
        }
    }

    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}_stats.json", self.details.command()))
    }

    /// Write stats to JSON file (atomic write-then-rename).
    pub fn write(&self, data_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let path = self.path_in(data_dir);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run stats")?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create {}", temp_path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e)
                .with_context(|| format!("Failed to rename stats file {}", path.display()));
        }

        debug!(path = %path.display(), "Wrote run stats");
        Ok(path)
    }
}
