//! Forward pass with activation caches and hand-derived backpropagation.

use std::path::PathBuf;

use thiserror::Error;

use crate::batch::BatchAccumulator;
use crate::network::{relu_derivative, softmax, Network, NetworkError};

/// Errors from training a [`Network`].
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("forward_with_cache called again before backward")]
    ForwardPending,

    #[error("backward called without a cached forward pass")]
    BackwardWithoutForward,

    #[error("Target length mismatch: expected {expected}, got {actual}")]
    TargetShape { expected: usize, actual: usize },

    #[error("Invalid training config: {0}")]
    InvalidConfig(String),

    #[error("No training examples found in {0}")]
    NoExamples(PathBuf),

    #[error("Invalid training example {path}: {reason}")]
    InvalidExample { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

/// Whether the trainer is waiting for a forward or a backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    ReadyForForward,
    ReadyForBackward,
}

#[derive(Debug, Clone)]
struct LayerCache {
    /// Pre-activation values
    z: Vec<f64>,
    /// Post-activation values; softmax output for the last layer
    a: Vec<f64>,
    delta: Vec<f64>,
}

impl LayerCache {
    fn new(size: usize) -> Self {
        Self {
            z: vec![0.0; size],
            a: vec![0.0; size],
            delta: vec![0.0; size],
        }
    }

    fn clear(&mut self) {
        self.z.fill(0.0);
        self.a.fill(0.0);
        self.delta.fill(0.0);
    }
}

/// Single-flight training wrapper around a mutably borrowed network.
///
/// Each [`Trainer::forward_with_cache`] must be followed by exactly one
/// [`Trainer::backward`] before the next forward pass.
pub struct Trainer<'a> {
    network: &'a mut Network,
    caches: Vec<LayerCache>,
    input: Vec<f64>,
    gradients: BatchAccumulator,
    state: TrainerState,
}

impl<'a> Trainer<'a> {
    pub fn new(network: &'a mut Network) -> Self {
        let caches = network
            .layers()
            .iter()
            .map(|l| LayerCache::new(l.output))
            .collect();
        let gradients = BatchAccumulator::for_network(network);
        Self {
            network,
            caches,
            input: Vec::new(),
            gradients,
            state: TrainerState::ReadyForForward,
        }
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn network(&self) -> &Network {
        self.network
    }

    pub fn gradients(&self) -> &BatchAccumulator {
        &self.gradients
    }

    /// Examples accumulated since the last flush.
    pub fn pending(&self) -> usize {
        self.gradients.len()
    }

    /// Same computation as [`Network::forward`], caching `z` and `a` per
    /// layer. Returns the softmax output.
    pub fn forward_with_cache(&mut self, input: &[f64]) -> Result<&[f64], TrainError> {
        if self.state == TrainerState::ReadyForBackward {
            return Err(TrainError::ForwardPending);
        }
        if input.len() != self.network.input_size() {
            return Err(NetworkError::ShapeMismatch {
                layer: 0,
                expected: self.network.input_size(),
                actual: input.len(),
            }
            .into());
        }

        self.input.clear();
        self.input.extend_from_slice(input);

        let mut out = input.to_vec();
        for (index, layer) in self.network.layers().iter().enumerate() {
            let cache = &mut self.caches[index];
            out = layer.feed_forward_into(&out, self.network.activation(index), &mut cache.z);
            cache.a.copy_from_slice(&out);
        }

        let last = self.caches.len() - 1;
        let probabilities = softmax(&out);
        self.caches[last].a.copy_from_slice(&probabilities);

        self.state = TrainerState::ReadyForBackward;
        Ok(&self.caches[last].a)
    }

    /// Softmax output of the pending forward pass.
    pub fn predicted(&self) -> Option<&[f64]> {
        match self.state {
            TrainerState::ReadyForBackward => self.caches.last().map(|c| c.a.as_slice()),
            TrainerState::ReadyForForward => None,
        }
    }

    /// Backpropagate the cross-entropy error against `target` into the
    /// gradient buffers, then clear the activation caches.
    pub fn backward(&mut self, target: &[f64]) -> Result<(), TrainError> {
        if self.state == TrainerState::ReadyForForward {
            return Err(TrainError::BackwardWithoutForward);
        }
        let outputs = self.network.output_size();
        if target.len() != outputs {
            return Err(TrainError::TargetShape {
                expected: outputs,
                actual: target.len(),
            });
        }

        let last = self.caches.len() - 1;

        // Softmax + cross-entropy: dL/dz = p - t
        {
            let cache = &mut self.caches[last];
            for ((d, p), t) in cache.delta.iter_mut().zip(&cache.a).zip(target) {
                *d = p - t;
            }
        }

        for index in (0..=last).rev() {
            if index < last {
                let (current, downstream) = self.caches.split_at_mut(index + 1);
                let current = &mut current[index];
                let next_delta = &downstream[0].delta;
                let next_weights = &self.network.layers()[index + 1].weights;

                for (j, d) in current.delta.iter_mut().enumerate() {
                    let sum: f64 = next_delta
                        .iter()
                        .zip(&next_weights[j])
                        .map(|(dk, w)| dk * w)
                        .sum();
                    *d = sum * relu_derivative(current.z[j]);
                }
            }

            let previous = if index == 0 {
                &self.input
            } else {
                &self.caches[index - 1].a
            };
            self.gradients
                .accumulate(index, &self.caches[index].delta, previous);
        }

        self.gradients.finish_example();
        for cache in &mut self.caches {
            cache.clear();
        }
        self.input.clear();
        self.state = TrainerState::ReadyForForward;
        Ok(())
    }

    /// Apply accumulated gradients. Returns the number of examples applied.
    pub fn flush(&mut self, learning_rate: f64) -> usize {
        self.gradients.flush(self.network, learning_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{cross_entropy, Layer};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn small_network() -> Network {
        Network::from_layers(vec![
            Layer {
                input: 2,
                output: 3,
                weights: vec![vec![0.4, -0.2, 0.7], vec![0.1, 0.5, -0.3]],
                biases: vec![0.05, 0.1, 0.2],
            },
            Layer {
                input: 3,
                output: 2,
                weights: vec![vec![0.3, -0.6], vec![0.8, 0.2], vec![-0.5, 0.9]],
                biases: vec![0.0, 0.1],
            },
        ])
        .unwrap()
    }

    fn loss(network: &Network, input: &[f64], target: &[f64]) -> f64 {
        cross_entropy(&network.forward(input, None).unwrap(), target)
    }

    #[test]
    fn test_forward_with_cache_matches_forward() {
        let mut network = small_network();
        let input = [0.7, -0.4];
        let expected = network.forward(&input, None).unwrap();

        let mut trainer = Trainer::new(&mut network);
        let cached = trainer.forward_with_cache(&input).unwrap().to_vec();
        assert_eq!(cached, expected);
        assert_eq!(trainer.predicted(), Some(expected.as_slice()));
    }

    #[test]
    fn test_caches_hold_pre_and_post_activations() {
        let mut network = Network::from_layers(vec![
            Layer {
                input: 2,
                output: 2,
                weights: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                biases: vec![0.0, 0.0],
            },
            Layer {
                input: 2,
                output: 2,
                weights: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
                biases: vec![0.0, 0.0],
            },
        ])
        .unwrap();
        let mut trainer = Trainer::new(&mut network);
        trainer.forward_with_cache(&[2.0, -1.0]).unwrap();

        assert_eq!(trainer.caches[0].z, vec![2.0, -1.0]);
        assert_eq!(trainer.caches[0].a, vec![2.0, 0.0]);
        assert_eq!(trainer.caches[1].z, vec![2.0, 4.0]);
        assert_eq!(trainer.caches[1].a, softmax(&[2.0, 4.0]));

        trainer.backward(&[0.0, 1.0]).unwrap();
        for cache in &trainer.caches {
            assert!(cache.z.iter().all(|&v| v == 0.0));
            assert!(cache.a.iter().all(|&v| v == 0.0));
            assert!(cache.delta.iter().all(|&v| v == 0.0));
        }
        assert!(trainer.input.is_empty());
    }

    #[test]
    fn test_state_machine_rejects_out_of_order_calls() {
        let mut network = small_network();
        let mut trainer = Trainer::new(&mut network);
        assert_eq!(trainer.state(), TrainerState::ReadyForForward);

        assert!(matches!(
            trainer.backward(&[1.0, 0.0]),
            Err(TrainError::BackwardWithoutForward)
        ));

        trainer.forward_with_cache(&[1.0, 1.0]).unwrap();
        assert_eq!(trainer.state(), TrainerState::ReadyForBackward);
        assert!(matches!(
            trainer.forward_with_cache(&[1.0, 1.0]),
            Err(TrainError::ForwardPending)
        ));

        trainer.backward(&[1.0, 0.0]).unwrap();
        assert_eq!(trainer.state(), TrainerState::ReadyForForward);
        assert!(trainer.predicted().is_none());
        assert_eq!(trainer.pending(), 1);
    }

    #[test]
    fn test_bad_shapes_leave_state_untouched() {
        let mut network = small_network();
        let mut trainer = Trainer::new(&mut network);

        assert!(matches!(
            trainer.forward_with_cache(&[1.0]),
            Err(TrainError::Network(NetworkError::ShapeMismatch { .. }))
        ));
        assert_eq!(trainer.state(), TrainerState::ReadyForForward);

        trainer.forward_with_cache(&[1.0, 0.5]).unwrap();
        assert!(matches!(
            trainer.backward(&[1.0, 0.0, 0.0]),
            Err(TrainError::TargetShape {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(trainer.state(), TrainerState::ReadyForBackward);
        trainer.backward(&[1.0, 0.0]).unwrap();
    }

    #[test]
    fn test_output_delta_is_prediction_minus_target() {
        let mut network = small_network();
        let input = [0.3, 0.9];
        let target = [0.0, 1.0];

        let mut trainer = Trainer::new(&mut network);
        let predicted = trainer.forward_with_cache(&input).unwrap().to_vec();
        trainer.backward(&target).unwrap();

        let db = trainer.gradients().bias_gradients(1);
        assert!((db[0] - predicted[0]).abs() < 1e-12);
        assert!((db[1] - (predicted[1] - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_analytic_gradient_matches_finite_difference() {
        let mut network = small_network();
        let input = [0.7, -0.4];
        let target = [0.0, 1.0];
        let h = 1e-6;

        let reference = network.clone();
        let mut trainer = Trainer::new(&mut network);
        trainer.forward_with_cache(&input).unwrap();
        trainer.backward(&target).unwrap();
        let gradients = trainer.gradients().clone();

        for (l, layer) in reference.layers().iter().enumerate() {
            for i in 0..layer.input {
                for j in 0..layer.output {
                    let mut plus = reference.clone();
                    plus.layers_mut()[l].weights[i][j] += h;
                    let mut minus = reference.clone();
                    minus.layers_mut()[l].weights[i][j] -= h;

                    let numeric =
                        (loss(&plus, &input, &target) - loss(&minus, &input, &target)) / (2.0 * h);
                    let analytic = gradients.weight_gradients(l)[i][j];
                    assert!(
                        (numeric - analytic).abs() < 1e-4,
                        "layer {} w[{}][{}]: numeric {} analytic {}",
                        l,
                        i,
                        j,
                        numeric,
                        analytic
                    );
                }
            }
            for j in 0..layer.output {
                let mut plus = reference.clone();
                plus.layers_mut()[l].biases[j] += h;
                let mut minus = reference.clone();
                minus.layers_mut()[l].biases[j] -= h;

                let numeric =
                    (loss(&plus, &input, &target) - loss(&minus, &input, &target)) / (2.0 * h);
                assert!((numeric - gradients.bias_gradients(l)[j]).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_gradient_check_on_random_deep_network() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut network = Network::new(&[4, 5, 3, 3], &mut rng).unwrap();
        let input = [0.2, 0.9, -0.3, 0.5];
        let target = [1.0, 0.0, 0.0];
        let h = 1e-6;

        let reference = network.clone();
        let mut trainer = Trainer::new(&mut network);
        trainer.forward_with_cache(&input).unwrap();
        trainer.backward(&target).unwrap();

        for (l, layer) in reference.layers().iter().enumerate() {
            for i in 0..layer.input {
                for j in 0..layer.output {
                    let mut plus = reference.clone();
                    plus.layers_mut()[l].weights[i][j] += h;
                    let mut minus = reference.clone();
                    minus.layers_mut()[l].weights[i][j] -= h;
                    let numeric =
                        (loss(&plus, &input, &target) - loss(&minus, &input, &target)) / (2.0 * h);
                    let analytic = trainer.gradients().weight_gradients(l)[i][j];
                    assert!((numeric - analytic).abs() < 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_training_step_reduces_loss() {
        let mut network = small_network();
        let input = [0.7, -0.4];
        let target = [0.0, 1.0];
        let before = loss(&network, &input, &target);

        {
            let mut trainer = Trainer::new(&mut network);
            for _ in 0..20 {
                trainer.forward_with_cache(&input).unwrap();
                trainer.backward(&target).unwrap();
                assert_eq!(trainer.flush(0.1), 1);
            }
        }

        assert!(loss(&network, &input, &target) < before);
    }

    #[test]
    fn test_single_layer_network_uses_input_as_previous_activation() {
        let mut network = Network::from_layers(vec![Layer::zeros(2, 2)]).unwrap();
        let mut trainer = Trainer::new(&mut network);
        trainer.forward_with_cache(&[1.0, 2.0]).unwrap();
        trainer.backward(&[1.0, 0.0]).unwrap();

        // p = [0.5, 0.5], delta = [-0.5, 0.5]
        let dw = trainer.gradients().weight_gradients(0);
        assert!((dw[0][0] + 0.5).abs() < 1e-12);
        assert!((dw[1][1] - 1.0).abs() < 1e-12);
    }
}
