//! Blocking implementations of the `t3` subcommands

use anyhow::{anyhow, Context, Result};
use ffnn::Network;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use selfplay::{generate_examples, ExampleGenerator};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

use crate::config::{Command, EvaluateArgs, GenerateArgs, TrainArgs};
use crate::evaluate::evaluate;
use crate::policy::{NetworkPolicy, RandomPolicy};
use crate::stats::RunDetails;
use games_tictactoe::{INPUT_SIZE, NUM_CELLS};

/// Run a subcommand to completion (or cancellation).
pub fn run(command: Command, cancel: &AtomicBool) -> Result<RunDetails> {
    match command {
        Command::Generate(args) => run_generate(&args, cancel),
        Command::Train(args) => run_train(&args, cancel),
        Command::Evaluate(args) => run_evaluate(&args, cancel),
    }
}

fn rng_from_seed(seed: Option<u64>) -> ChaCha20Rng {
    match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    }
}

/// Progress bar on stderr, only when it is a terminal.
fn progress_bar(len: u64, unit: &str) -> Result<Option<ProgressBar>> {
    if !std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        return Ok(None);
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{eta}}) {{msg}}",
                unit
            ))?
            .progress_chars("#>-"),
    );
    Ok(Some(pb))
}

/// Run `log` without the bar redrawing over its output.
fn log_above(pb: Option<&ProgressBar>, log: impl FnOnce()) {
    match pb {
        Some(pb) => pb.suspend(log),
        None => log(),
    }
}

fn run_generate(args: &GenerateArgs, cancel: &AtomicBool) -> Result<RunDetails> {
    let mut generator = ExampleGenerator::new(rng_from_seed(args.seed()), args.generator_config());
    let pb = progress_bar(args.count as u64, "examples")?;

    info!(
        count = args.count,
        out_dir = %args.out_dir,
        break_threshold = args.break_threshold,
        "Generating training examples"
    );

    let report = generate_examples(
        &mut generator,
        Path::new(&args.out_dir),
        args.count,
        cancel,
        |_| {
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        },
    )
    .with_context(|| format!("Failed to generate examples in {}", args.out_dir))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!(
        written = report.written,
        duplicates = report.duplicates,
        cancelled = report.cancelled,
        "Done generating training data"
    );

    Ok(RunDetails::Generate {
        out_dir: args.out_dir.clone(),
        requested: args.count,
        written: report.written,
        duplicates: report.duplicates,
        cancelled: report.cancelled,
    })
}

fn check_io_shape(network: &Network, path: &Path) -> Result<()> {
    if network.input_size() != INPUT_SIZE || network.output_size() != NUM_CELLS {
        return Err(anyhow!(
            "{} has shape {}->{}, expected {}->{}",
            path.display(),
            network.input_size(),
            network.output_size(),
            INPUT_SIZE,
            NUM_CELLS
        ));
    }
    Ok(())
}

fn run_train(args: &TrainArgs, cancel: &AtomicBool) -> Result<RunDetails> {
    let mut rng = rng_from_seed(args.seed());
    let weights_path = Path::new(&args.weights_file);

    let mut network = if args.resume && weights_path.exists() {
        info!(path = %weights_path.display(), "Resuming from existing weights");
        let network = Network::load(weights_path)
            .with_context(|| format!("Failed to load {}", weights_path.display()))?;
        check_io_shape(&network, weights_path)?;
        network
    } else {
        if args.resume {
            warn!(path = %weights_path.display(), "No weights to resume from, starting fresh");
        }
        info!(layers = ?args.layers, "Creating neural network");
        Network::new(&args.layers, &mut rng)?
    };

    let config = args.training_config();
    let pb = progress_bar(config.epochs as u64, "epochs")?;

    let report = ffnn::train_with_progress(&mut network, &config, &mut rng, cancel, |epoch| {
        log_above(pb.as_ref(), || {
            info!(
                epoch = epoch.epoch,
                mean_cost = epoch.mean_cost,
                batches = epoch.batches,
                "Epoch complete"
            )
        });
        if let Some(pb) = &pb {
            pb.set_message(format!("cost {:.4}", epoch.mean_cost));
            pb.inc(1);
        }
    })
    .with_context(|| format!("Training on {} failed", args.examples_dir))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    network
        .save(weights_path)
        .with_context(|| format!("Failed to save {}", weights_path.display()))?;

    info!(
        epochs = report.epochs_run,
        final_cost = ?report.final_cost,
        stop_reason = ?report.stop_reason,
        weights = %weights_path.display(),
        "Weights written"
    );

    Ok(RunDetails::train(&args.weights_file, &report))
}

fn run_evaluate(args: &EvaluateArgs, cancel: &AtomicBool) -> Result<RunDetails> {
    let weights_path = Path::new(&args.weights_file);
    let network = Network::load(weights_path)
        .with_context(|| format!("Failed to load {}", weights_path.display()))?;
    check_io_shape(&network, weights_path)?;
    info!(path = %weights_path.display(), "Loaded neural network");

    let mut network = NetworkPolicy::new(network);
    let mut opponent = match args.seed() {
        Some(seed) => RandomPolicy::with_seed(seed),
        None => RandomPolicy::new(),
    };
    let pb = progress_bar(args.games as u64, "games")?;

    let summary = evaluate(&mut network, &mut opponent, args.games, cancel, |_| {
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    })?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!(
        games = summary.games,
        network_wins = summary.network_wins,
        opponent_wins = summary.opponent_wins,
        draws = summary.draws,
        agreement = format!("{:.1}%", summary.agreement() * 100.0),
        optimal = format!("{:.1}%", summary.optimal_rate() * 100.0),
        "Evaluation complete"
    );

    Ok(RunDetails::evaluate(&args.weights_file, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EvaluateArgs, GenerateArgs, TrainArgs};

    #[test]
    fn generate_train_evaluate_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let examples = dir.path().join("examples");
        let weights = dir.path().join("weights.json");
        let cancel = AtomicBool::new(false);

        let generate = GenerateArgs {
            out_dir: examples.to_string_lossy().into_owned(),
            count: 20,
            break_threshold: 90.0,
            threshold_decay: 0.0001,
            max_retries: 100,
            max_duplicates: 1000,
            seed: Some(1),
        };
        match run(Command::Generate(generate), &cancel).unwrap() {
            RunDetails::Generate { written, .. } => assert_eq!(written, 20),
            other => panic!("unexpected {:?}", other),
        }

        let train = TrainArgs {
            examples_dir: examples.to_string_lossy().into_owned(),
            weights_file: weights.to_string_lossy().into_owned(),
            layers: vec![18, 16, 9],
            learning_rate: 0.01,
            cost_threshold: 0.0,
            epochs: 3,
            batch_size: 4,
            resume: false,
            seed: Some(2),
        };
        match run(Command::Train(train), &cancel).unwrap() {
            RunDetails::Train { epochs_run, .. } => assert_eq!(epochs_run, 3),
            other => panic!("unexpected {:?}", other),
        }
        assert!(weights.exists());

        let eval = EvaluateArgs {
            weights_file: weights.to_string_lossy().into_owned(),
            games: 4,
            seed: Some(3),
        };
        match run(Command::Evaluate(eval), &cancel).unwrap() {
            RunDetails::Evaluate { summary, .. } => assert_eq!(summary.games, 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn log_above_runs_with_and_without_bar() {
        let mut calls = 0;
        log_above(None, || calls += 1);

        let pb = ProgressBar::hidden();
        pb.inc(3);
        log_above(Some(&pb), || calls += 1);

        assert_eq!(calls, 2);
        assert_eq!(pb.position(), 3);
    }

    #[test]
    fn evaluate_rejects_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("weights.json");
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        Network::new(&[4, 9], &mut rng).unwrap().save(&weights).unwrap();

        let eval = EvaluateArgs {
            weights_file: weights.to_string_lossy().into_owned(),
            games: 1,
            seed: Some(0),
        };
        let err = run(Command::Evaluate(eval), &AtomicBool::new(false)).unwrap_err();
        assert!(err.to_string().contains("expected 18->9"));
    }
}
