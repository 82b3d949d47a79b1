//! Gradient accumulation across a mini-batch.

use crate::network::Network;

/// Summed weight and bias gradients for every layer of a network.
///
/// Gradients only ever accumulate. [`BatchAccumulator::flush`] applies them
/// scaled by `learning_rate / examples` and zeroes the buffers, so a trailing
/// partial batch is averaged over its real size.
#[derive(Debug, Clone)]
pub struct BatchAccumulator {
    weights: Vec<Vec<Vec<f64>>>,
    biases: Vec<Vec<f64>>,
    examples: usize,
}

impl BatchAccumulator {
    /// Zeroed buffers shaped like `network`.
    pub fn for_network(network: &Network) -> Self {
        Self {
            weights: network
                .layers()
                .iter()
                .map(|l| vec![vec![0.0; l.output]; l.input])
                .collect(),
            biases: network
                .layers()
                .iter()
                .map(|l| vec![0.0; l.output])
                .collect(),
            examples: 0,
        }
    }

    /// Add one layer's contribution: `dW[i][j] += delta[j] * prev[i]`,
    /// `db[j] += delta[j]`.
    pub fn accumulate(&mut self, layer: usize, delta: &[f64], previous_activation: &[f64]) {
        for (row, &a) in self.weights[layer].iter_mut().zip(previous_activation) {
            for (g, &d) in row.iter_mut().zip(delta) {
                *g += d * a;
            }
        }
        for (g, &d) in self.biases[layer].iter_mut().zip(delta) {
            *g += d;
        }
    }

    /// Count one example as fully accumulated.
    pub fn finish_example(&mut self) {
        self.examples += 1;
    }

    /// Examples accumulated since the last flush.
    pub fn len(&self) -> usize {
        self.examples
    }

    pub fn is_empty(&self) -> bool {
        self.examples == 0
    }

    pub fn weight_gradients(&self, layer: usize) -> &[Vec<f64>] {
        &self.weights[layer]
    }

    pub fn bias_gradients(&self, layer: usize) -> &[f64] {
        &self.biases[layer]
    }

    /// Apply `W -= lr / n * dW` (and the same for biases), then reset.
    /// Returns the number of examples applied; an empty batch is a no-op.
    pub fn flush(&mut self, network: &mut Network, learning_rate: f64) -> usize {
        let n = self.examples;
        if n == 0 {
            return 0;
        }

        let scale = learning_rate / n as f64;
        for (layer, (dw, db)) in network
            .layers_mut()
            .iter_mut()
            .zip(self.weights.iter().zip(&self.biases))
        {
            for (row, grad_row) in layer.weights.iter_mut().zip(dw) {
                for (w, g) in row.iter_mut().zip(grad_row) {
                    *w -= scale * g;
                }
            }
            for (b, g) in layer.biases.iter_mut().zip(db) {
                *b -= scale * g;
            }
        }

        self.reset();
        n
    }

    /// Zero every buffer and the example count.
    pub fn reset(&mut self) {
        for layer in &mut self.weights {
            for row in layer.iter_mut() {
                row.fill(0.0);
            }
        }
        for layer in &mut self.biases {
            layer.fill(0.0);
        }
        self.examples = 0;
    }
}
