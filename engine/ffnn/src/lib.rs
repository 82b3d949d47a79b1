//! Small dense feed-forward network for move prediction.
//!
//! Hidden layers use ReLU, the last layer emits logits and [`Network::forward`]
//! turns them into a probability distribution with a stable softmax.
//! Training is plain mini-batch gradient descent on categorical
//! cross-entropy with gradients derived by hand:
//!
//! - [`Trainer`] runs forward passes that cache pre/post activations and
//!   backward passes that push deltas into a [`BatchAccumulator`]. A two-state
//!   machine enforces that every forward pass is matched by exactly one
//!   backward pass.
//! - [`BatchAccumulator`] owns the summed gradients and applies them to the
//!   network on flush, scaled by the number of examples seen.
//! - [`train`] drives epochs over a directory of JSON example files.
//!
//! # Usage
//!
//! ```rust
//! use ffnn::Network;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let network = Network::new(&[18, 32, 9], &mut rng).unwrap();
//!
//! let probabilities = network.forward(&[0.0; 18], None).unwrap();
//! assert_eq!(probabilities.len(), 9);
//! assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
//! ```

mod batch;
mod config;
mod example;
mod network;
mod train;
mod trainer;

pub use batch::BatchAccumulator;
pub use config::TrainingConfig;
pub use example::{list_example_files, TrainingExample};
pub use network::{
    cross_entropy, rank_positions, relu, relu_derivative, softmax, Activation, ForwardTrace,
    Layer, Network, NetworkError, LOG_EPSILON,
};
pub use train::{train, train_with_progress, EpochSummary, StopReason, TrainingReport};
pub use trainer::{TrainError, Trainer, TrainerState};
