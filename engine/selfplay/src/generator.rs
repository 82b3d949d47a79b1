use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use ffnn::TrainingExample;
use games_tictactoe::{GameState, GameStateOptions, MoveError, SetupError, NUM_CELLS};
use rand::seq::IteratorRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::schedule::ThresholdSchedule;

/// Largest batch [`generate_examples`] accepts.
pub const MAX_EXAMPLES: usize = 1_000_000;

/// Player whose turns can be labelled; the oracle plays this side.
const LABELLED_PLAYER: u8 = 2;

/// Stop thresholds are percentages rolled against `0..ROLL_RANGE`.
const ROLL_RANGE: u32 = 100;

/// Errors from example generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("No labelled position after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("Example {index} produced {duplicates} duplicates in a row")]
    DuplicatesExhausted { index: usize, duplicates: u32 },

    #[error("Invalid example count {0} (expected 1-1000000)")]
    InvalidCount(usize),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize example: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Move error: {0}")]
    Move(#[from] MoveError),

    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),
}

/// Knobs for a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Starting stop threshold in percent.
    pub break_threshold: f64,

    /// Per-example decay factor for the threshold schedule.
    pub threshold_decay: f64,

    /// Discarded games allowed before an example fails.
    pub max_retries: u32,

    /// Consecutive duplicate examples allowed for one file index.
    pub max_duplicates: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            break_threshold: 90.0,
            threshold_decay: 0.0001,
            max_retries: 100,
            max_duplicates: 100_000,
        }
    }
}

impl GeneratorConfig {
    /// Builder pattern: set starting threshold.
    pub fn with_break_threshold(mut self, threshold: f64) -> Self {
        self.break_threshold = threshold;
        self
    }

    /// Builder pattern: set threshold decay.
    pub fn with_threshold_decay(mut self, decay: f64) -> Self {
        self.threshold_decay = decay;
        self
    }

    /// Builder pattern: set retry bound.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Builder pattern: set duplicate bound.
    pub fn with_max_duplicates(mut self, duplicates: u32) -> Self {
        self.max_duplicates = duplicates;
        self
    }
}

/// A labelled position plus how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub example: TrainingExample,
    /// Oracle move used as the one-hot target (1-indexed)
    pub best_move: u8,
    pub moves_played: u32,
    /// Games played, including the one that produced the label
    pub attempts: u32,
}

/// Outcome of [`generate_examples`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub written: usize,
    pub duplicates: u64,
    pub cancelled: bool,
}

/// Self-play driver owning its random source.
pub struct ExampleGenerator<R: Rng> {
    rng: R,
    config: GeneratorConfig,
}

impl<R: Rng> ExampleGenerator<R> {
    pub fn new(rng: R, config: GeneratorConfig) -> Self {
        Self { rng, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Play random games until one is stopped and labelled.
    ///
    /// `threshold` is the stop chance in percent. Each discarded game raises
    /// it by one (up to 99) before the next attempt.
    pub fn create_example(&mut self, threshold: u32) -> Result<LabeledExample, GenerateError> {
        let mut threshold = threshold;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if let Some(mut labeled) = self.play_once(threshold)? {
                labeled.attempts = attempt;
                return Ok(labeled);
            }

            if attempt > self.config.max_retries {
                return Err(GenerateError::Exhausted { attempts: attempt });
            }
            if threshold < ROLL_RANGE - 1 {
                threshold += 1;
            }
        }
    }

    /// One game. `None` if it ended before a label was taken.
    fn play_once(&mut self, threshold: u32) -> Result<Option<LabeledExample>, GenerateError> {
        let first_player = self.rng.gen_range(1..=2);
        let mut game = GameState::new(GameStateOptions::default().with_first_player(first_player))?;
        let mut moves_played = 0u32;

        loop {
            if moves_played > 0
                && game.current_player() == LABELLED_PLAYER
                && self.rng.gen_range(0..ROLL_RANGE) < threshold
            {
                return Ok(Some(label(&game, moves_played)));
            }

            let position = game
                .board()
                .legal_positions()
                .choose(&mut self.rng)
                .ok_or(MoveError::InvalidPosition(0))?;
            if !game.play(position)? {
                return Err(MoveError::CellOccupied(position).into());
            }

            if game.is_terminal() {
                return Ok(None);
            }
            moves_played += 1;
        }
    }
}

fn label(game: &GameState, moves_played: u32) -> LabeledExample {
    let best_move = minimax::best_move(game.board());
    let mut target = vec![0.0; NUM_CELLS];
    target[best_move as usize - 1] = 1.0;

    LabeledExample {
        example: TrainingExample::new(game.network_input().to_vec(), target),
        best_move,
        moves_played,
        attempts: 1,
    }
}

/// File name for 1-based example `index`.
pub fn example_file_name(index: usize) -> String {
    format!("t3_{:06}.json", index)
}

/// Write `count` distinct examples to `out_dir` as `t3_000001.json` onwards.
///
/// Examples whose serialized bytes hash the same as an earlier one are
/// regenerated. The cancel flag is checked before each example; a cancelled
/// run keeps the files already written.
pub fn generate_examples<R, F>(
    generator: &mut ExampleGenerator<R>,
    out_dir: &Path,
    count: usize,
    cancel: &AtomicBool,
    mut on_example: F,
) -> Result<GenerationReport, GenerateError>
where
    R: Rng,
    F: FnMut(&LabeledExample),
{
    if count == 0 || count > MAX_EXAMPLES {
        return Err(GenerateError::InvalidCount(count));
    }
    fs::create_dir_all(out_dir).map_err(|source| GenerateError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let config = generator.config().clone();
    let mut schedule =
        ThresholdSchedule::new(config.break_threshold, config.threshold_decay, count);
    let mut hashes: HashSet<String> = HashSet::with_capacity(count);
    let mut report = GenerationReport::default();

    info!(count, out_dir = %out_dir.display(), "Generating examples");

    for index in 1..=count {
        if cancel.load(Ordering::Relaxed) {
            warn!(written = report.written, "Generation cancelled");
            report.cancelled = true;
            break;
        }

        let threshold = schedule.advance(index);
        let mut duplicates = 0u32;

        let (labeled, data, hash) = loop {
            let labeled = generator.create_example(threshold)?;
            let data = labeled.example.to_json()?;
            let hash = blake3::hash(&data).to_hex().to_string();
            if !hashes.contains(&hash) {
                break (labeled, data, hash);
            }

            duplicates += 1;
            report.duplicates += 1;
            if duplicates > config.max_duplicates {
                return Err(GenerateError::DuplicatesExhausted { index, duplicates });
            }
        };

        let path = out_dir.join(example_file_name(index));
        fs::write(&path, &data).map_err(|source| GenerateError::Io {
            path: path.clone(),
            source,
        })?;
        hashes.insert(hash.clone());
        report.written += 1;

        debug!(
            index,
            threshold,
            moves_played = labeled.moves_played,
            attempts = labeled.attempts,
            hash = %hash,
            "Generated example"
        );
        on_example(&labeled);
    }

    info!(
        written = report.written,
        duplicates = report.duplicates,
        "Example generation finished"
    );
    Ok(report)
}
