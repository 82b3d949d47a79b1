//! Layers, forward inference and weights persistence.

use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Added inside the logarithm of the cross-entropy so `ln(0)` never happens.
pub const LOG_EPSILON: f64 = 1e-15;

/// Errors building, running or persisting a [`Network`].
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Input length mismatch at layer {layer}: expected {expected}, got {actual}")]
    ShapeMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Layer {layer} outputs {output} values but layer {next} expects {next_input}")]
    LayerChain {
        layer: usize,
        output: usize,
        next: usize,
        next_input: usize,
    },

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid weights JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Element-wise activation applied after a layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    /// Used by the output layer, which emits logits
    Identity,
}

impl Activation {
    pub fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => relu(z),
            Activation::Identity => z,
        }
    }
}

pub fn relu(z: f64) -> f64 {
    if z > 0.0 {
        z
    } else {
        0.0
    }
}

/// Subgradient of ReLU, taken as 0 at the kink.
pub fn relu_derivative(z: f64) -> f64 {
    if z > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Numerically stable softmax: the maximum is subtracted before exponentiating.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Categorical cross-entropy `-sum(t * ln(p + eps))`.
pub fn cross_entropy(predicted: &[f64], target: &[f64]) -> f64 {
    -predicted
        .iter()
        .zip(target)
        .map(|(p, t)| t * (p + LOG_EPSILON).ln())
        .sum::<f64>()
}

/// Positions 1..=n ordered by descending probability. Ties keep the lower
/// position first.
pub fn rank_positions(probabilities: &[f64]) -> Vec<u8> {
    let mut cells: Vec<usize> = (0..probabilities.len()).collect();
    cells.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
    cells.into_iter().map(|cell| cell as u8 + 1).collect()
}

/// One fully-connected layer. `weights[i][j]` connects input `i` to output `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub input: usize,
    pub output: usize,
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

impl Layer {
    /// Layer with all weights and biases set to zero.
    pub fn zeros(input: usize, output: usize) -> Self {
        Self {
            input,
            output,
            weights: vec![vec![0.0; output]; input],
            biases: vec![0.0; output],
        }
    }

    /// Weights drawn uniformly from [0, 1), zero biases.
    pub fn random<R: Rng + ?Sized>(input: usize, output: usize, rng: &mut R) -> Self {
        let mut layer = Self::zeros(input, output);
        for row in &mut layer.weights {
            for w in row.iter_mut() {
                *w = rng.gen::<f64>();
            }
        }
        layer
    }

    fn check_shape(&self, index: usize) -> Result<(), NetworkError> {
        if self.input == 0 || self.output == 0 {
            return Err(NetworkError::InvalidTopology(format!(
                "layer {} has a zero dimension ({}x{})",
                index, self.input, self.output
            )));
        }
        if self.weights.len() != self.input
            || self.weights.iter().any(|row| row.len() != self.output)
        {
            return Err(NetworkError::InvalidTopology(format!(
                "layer {} declares {}x{} but its weight matrix does not match",
                index, self.input, self.output
            )));
        }
        if self.biases.len() != self.output {
            return Err(NetworkError::InvalidTopology(format!(
                "layer {} declares {} outputs but has {} biases",
                index,
                self.output,
                self.biases.len()
            )));
        }
        Ok(())
    }

    /// Affine transform into `z`, activation into the returned vector.
    pub(crate) fn feed_forward_into(
        &self,
        input: &[f64],
        activation: Activation,
        z: &mut [f64],
    ) -> Vec<f64> {
        for (j, zj) in z.iter_mut().enumerate() {
            *zj = self.biases[j]
                + input
                    .iter()
                    .zip(&self.weights)
                    .map(|(x, row)| x * row[j])
                    .sum::<f64>();
        }
        z.iter().map(|&v| activation.apply(v)).collect()
    }

    pub fn feed_forward(&self, input: &[f64], activation: Activation) -> Vec<f64> {
        let mut z = vec![0.0; self.output];
        self.feed_forward_into(input, activation, &mut z)
    }
}

/// Snapshots recorded by [`Network::forward`]: the input, each layer's output
/// (logits for the last layer), then the softmax output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardTrace {
    pub layer_outputs: Vec<Vec<f64>>,
}

/// Stacked fully-connected layers in evaluation order.
///
/// Deserializing goes through the same checks as [`Network::from_layers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNetwork")]
pub struct Network {
    layers: Vec<Layer>,
}

/// Weights document as stored on disk, before validation.
#[derive(Deserialize)]
struct RawNetwork {
    layers: Vec<Layer>,
}

impl TryFrom<RawNetwork> for Network {
    type Error = NetworkError;

    fn try_from(raw: RawNetwork) -> Result<Self, Self::Error> {
        Network::from_layers(raw.layers)
    }
}

impl Network {
    /// Build a network from neuron counts, e.g. `[18, 32, 9]` for one hidden
    /// layer. Weights are uniform in [0, 1), biases zero.
    pub fn new<R: Rng + ?Sized>(neurons: &[usize], rng: &mut R) -> Result<Self, NetworkError> {
        if neurons.len() < 2 {
            return Err(NetworkError::InvalidTopology(format!(
                "need at least 2 layer sizes, got {}",
                neurons.len()
            )));
        }
        if let Some(pos) = neurons.iter().position(|&n| n == 0) {
            return Err(NetworkError::InvalidTopology(format!(
                "layer size {} is zero",
                pos
            )));
        }

        let layers = neurons
            .windows(2)
            .map(|pair| Layer::random(pair[0], pair[1], rng))
            .collect();
        Ok(Self { layers })
    }

    /// Wrap existing layers after checking shapes and chaining.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self, NetworkError> {
        let network = Self { layers };
        network.validate()?;
        Ok(network)
    }

    fn validate(&self) -> Result<(), NetworkError> {
        if self.layers.is_empty() {
            return Err(NetworkError::InvalidTopology("network has no layers".into()));
        }
        for (index, layer) in self.layers.iter().enumerate() {
            layer.check_shape(index)?;
        }
        for (index, pair) in self.layers.windows(2).enumerate() {
            if pair[0].output != pair[1].input {
                return Err(NetworkError::LayerChain {
                    layer: index,
                    output: pair[0].output,
                    next: index + 1,
                    next_input: pair[1].input,
                });
            }
        }
        Ok(())
    }

    /// Load a weights file and validate every layer.
    pub fn load(path: &Path) -> Result<Self, NetworkError> {
        let data = fs::read(path).map_err(|source| NetworkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawNetwork =
            serde_json::from_slice(&data).map_err(|source| NetworkError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let network = Network::try_from(raw)?;
        debug!(path = %path.display(), layers = network.layers.len(), "Loaded network");
        Ok(network)
    }

    /// Write the weights file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), NetworkError> {
        let io_err = |source| NetworkError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let data = serde_json::to_vec(self).map_err(|source| NetworkError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(io_err)?;
        debug!(path = %path.display(), "Saved network");
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.output)
    }

    /// Activation used by layer `index`.
    pub fn activation(&self, index: usize) -> Activation {
        if index + 1 == self.layers.len() {
            Activation::Identity
        } else {
            Activation::Relu
        }
    }

    /// Run inference and return the softmax distribution over outputs.
    ///
    /// When `trace` is given it is overwritten with `layers + 1` snapshots.
    pub fn forward(
        &self,
        input: &[f64],
        mut trace: Option<&mut ForwardTrace>,
    ) -> Result<Vec<f64>, NetworkError> {
        if input.len() != self.input_size() {
            return Err(NetworkError::ShapeMismatch {
                layer: 0,
                expected: self.input_size(),
                actual: input.len(),
            });
        }

        if let Some(t) = trace.as_deref_mut() {
            t.layer_outputs.clear();
            t.layer_outputs.push(input.to_vec());
        }

        let mut out = input.to_vec();
        for (index, layer) in self.layers.iter().enumerate() {
            out = layer.feed_forward(&out, self.activation(index));
            if let Some(t) = trace.as_deref_mut() {
                t.layer_outputs.push(out.clone());
            }
        }

        let probabilities = softmax(&out);
        if let Some(t) = trace {
            t.layer_outputs.push(probabilities.clone());
        }
        Ok(probabilities)
    }
}
