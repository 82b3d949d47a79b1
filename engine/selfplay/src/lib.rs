//! Training data from random self-play.
//!
//! Games start with a random first player and continue with uniformly random
//! legal moves. Whenever it is player 2's turn and at least one move has been
//! played, a roll against the stop threshold decides whether to stop and
//! label the position with the oracle's best move. Games that end before a
//! label is taken are discarded and replayed with a slightly higher threshold.
//!
//! [`generate_examples`] writes a batch of distinct examples to disk, one
//! JSON file per example.

mod generator;
mod schedule;

pub use generator::{
    example_file_name, generate_examples, ExampleGenerator, GenerateError, GenerationReport,
    GeneratorConfig, LabeledExample, MAX_EXAMPLES,
};
pub use schedule::ThresholdSchedule;
