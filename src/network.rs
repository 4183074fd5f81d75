//! Sequential network container
//!
//! The Network owns an ordered layer sequence and one loss, and drives the
//! whole training loop: forward inference with cached activations,
//! backpropagation, mini-batch gradient accumulation and averaging, epoch
//! scheduling, evaluation metrics, and weight persistence.

use ndarray::ArrayD;
use rand::seq::SliceRandom;
use rand::Rng;
use std::error::Error;

use crate::checkpoint::{self, LayerState, DEFAULT_WEIGHTS_PATH};
use crate::layers::{BackwardOutput, Layer};
use crate::losses::{Label, Loss};
use crate::utils::argmax;

/// One training example: an input array and its target.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub input: ArrayD<f64>,
    pub label: Label,
}

/// Per-layer parameter gradients collected by backpropagation.
///
/// One slot per layer, in architecture order. Layers without parameters hold
/// the `NoParams` marker so the slot list always lines up with the layer
/// list.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterGradient {
    /// The layer owns no parameters.
    NoParams,
    /// Gradients shape-matched to the layer's weights and bias.
    Parameters {
        weights: ArrayD<f64>,
        bias: ArrayD<f64>,
    },
}

impl ParameterGradient {
    /// Elementwise-add `other` into this slot. An empty slot adopts the
    /// incoming record unchanged.
    fn accumulate(&mut self, other: ParameterGradient) {
        match other {
            ParameterGradient::NoParams => {}
            ParameterGradient::Parameters {
                weights: dw,
                bias: db,
            } => match self {
                ParameterGradient::NoParams => {
                    *self = ParameterGradient::Parameters {
                        weights: dw,
                        bias: db,
                    };
                }
                ParameterGradient::Parameters { weights, bias } => {
                    *weights += &dw;
                    *bias += &db;
                }
            },
        }
    }
}

/// Sequential network: ordered layers plus one loss.
///
/// The architecture is fixed at construction. Training data is assigned
/// explicitly and only replaced as a whole; the evaluation metrics read a
/// fixed-size prefix of it (`eval_samples`), so callers control how much of
/// the dataset the per-epoch metrics cost.
///
/// All operations run to completion on the calling thread. Shape mismatches
/// anywhere in the chain (layer wiring, labels, loaded weights) surface as
/// array errors and abort the call; nothing is caught or retried.
///
/// # Example
///
/// ```
/// use micronet::layers::{DenseLayer, Layer, SoftmaxLayer};
/// use micronet::losses::CrossEntropy;
/// use micronet::network::Network;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let layers: Vec<Box<dyn Layer>> = vec![
///     Box::new(DenseLayer::new(4, 3, &mut rng)),
///     Box::new(SoftmaxLayer),
/// ];
/// let network = Network::new(layers, Box::new(CrossEntropy), 100);
/// assert_eq!(network.trainability(), &[true, false]);
/// ```
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
    loss: Box<dyn Loss>,
    trainability: Vec<bool>,
    training_data: Vec<Sample>,
    eval_samples: usize,
}

impl Network {
    /// Build a network from an ordered layer sequence and a loss.
    ///
    /// `eval_samples` is the number of leading training samples
    /// `average_loss` and `accuracy` evaluate. The per-layer trainability
    /// flags are cached here and never change afterwards.
    pub fn new(layers: Vec<Box<dyn Layer>>, loss: Box<dyn Loss>, eval_samples: usize) -> Self {
        let trainability = layers.iter().map(|layer| layer.trainable()).collect();
        Self {
            layers,
            loss,
            trainability,
            training_data: Vec::new(),
            eval_samples,
        }
    }

    /// Replace the training dataset.
    pub fn set_training_data(&mut self, data: Vec<Sample>) {
        self.training_data = data;
    }

    /// The stored training dataset, in assignment order.
    pub fn training_data(&self) -> &[Sample] {
        &self.training_data
    }

    /// Cached per-layer trainability flags, in layer order.
    pub fn trainability(&self) -> &[bool] {
        &self.trainability
    }

    /// Number of layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Total number of trainable parameters across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.parameter_count()).sum()
    }

    /// Forward pass returning every intermediate activation.
    ///
    /// The result holds `layers + 1` arrays: index 0 is a copy of the input,
    /// index `k` the output of layer `k - 1`. Keeping every intermediate is
    /// what lets `gradient` hand each layer its original forward input.
    pub fn forward(&self, input: &ArrayD<f64>) -> Vec<ArrayD<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.clone());
        for layer in &self.layers {
            let output = layer.forward(
                activations
                    .last()
                    .expect("activations start with the input"),
            );
            activations.push(output);
        }
        activations
    }

    /// Run forward on a sample and score the final activation.
    ///
    /// Returns the full activation sequence together with the scalar loss.
    pub fn evaluate(&self, sample: &Sample) -> (Vec<ArrayD<f64>>, f64) {
        let activations = self.forward(&sample.input);
        let cost = self.loss.forward(
            activations
                .last()
                .expect("activations start with the input"),
            &sample.label,
        );
        (activations, cost)
    }

    /// Backpropagation for one sample.
    ///
    /// Runs forward, seeds the gradient from the loss, then walks the layers
    /// last to first, handing each its upstream gradient and cached forward
    /// input. Returns one `ParameterGradient` per layer, in original layer
    /// order.
    pub fn gradient(&self, sample: &Sample) -> Vec<ParameterGradient> {
        let activations = self.forward(&sample.input);
        let mut upstream = self.loss.backward(
            activations
                .last()
                .expect("activations start with the input"),
            &sample.label,
        );

        let mut records = Vec::with_capacity(self.layers.len());
        for (index, layer) in self.layers.iter().enumerate().rev() {
            match layer.backward(&upstream, &activations[index]) {
                BackwardOutput::InputGradient(grad) => {
                    records.push(ParameterGradient::NoParams);
                    upstream = grad;
                }
                BackwardOutput::Gradients {
                    input,
                    weights,
                    bias,
                } => {
                    records.push(ParameterGradient::Parameters { weights, bias });
                    upstream = input;
                }
            }
        }
        records.reverse();
        records
    }

    /// One batch-averaged gradient-descent step.
    ///
    /// Accumulates every sample's parameter gradients into per-layer sums,
    /// then applies `p -= sum * learning_rate / batch_len` to each trainable
    /// layer. Updates happen strictly after the whole batch is accumulated.
    /// With a batch of one sample this is a plain single-sample step.
    ///
    /// An empty batch is a caller error (division by zero in the averaging).
    pub fn train_batch(&mut self, batch: &[Sample], learning_rate: f64) {
        let mut totals: Vec<ParameterGradient> = self
            .layers
            .iter()
            .map(|_| ParameterGradient::NoParams)
            .collect();

        for sample in batch {
            for (total, grad) in totals.iter_mut().zip(self.gradient(sample)) {
                total.accumulate(grad);
            }
        }

        let scale = learning_rate / batch.len() as f64;
        for ((layer, total), &trainable) in self
            .layers
            .iter_mut()
            .zip(&totals)
            .zip(&self.trainability)
        {
            if !trainable {
                continue;
            }
            if let ParameterGradient::Parameters { weights, bias } = total {
                layer.update_parameters(weights, bias, scale);
            }
        }
    }

    /// One pass over the training dataset.
    ///
    /// Shuffles a copy of the dataset — the stored dataset keeps its
    /// assignment order, so repeated epochs reshuffle independently — then
    /// trains on consecutive chunks of `batch_size` (the last chunk may be
    /// smaller).
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn train_epoch<R: Rng>(&mut self, batch_size: usize, learning_rate: f64, rng: &mut R) {
        let mut shuffled = self.training_data.clone();
        shuffled.shuffle(rng);

        for batch in shuffled.chunks(batch_size) {
            self.train_batch(batch, learning_rate);
        }
        log::debug!(
            "epoch complete: {} samples in batches of {}",
            shuffled.len(),
            batch_size
        );
    }

    /// Mean loss over the evaluation prefix of the training dataset.
    ///
    /// Evaluates the first `min(eval_samples, len)` stored samples. Calling
    /// this with no training data is a caller error.
    pub fn average_loss(&self) -> f64 {
        let count = self.eval_samples.min(self.training_data.len());
        let total: f64 = self.training_data[..count]
            .iter()
            .map(|sample| self.evaluate(sample).1)
            .sum();
        total / count as f64
    }

    /// Percentage (0–100) of evaluation-prefix samples whose arg-max
    /// prediction matches the label.
    ///
    /// Class labels compare against the predicted class directly; array
    /// labels compare arg-max to arg-max.
    pub fn accuracy(&self) -> f64 {
        let count = self.eval_samples.min(self.training_data.len());
        let correct = self.training_data[..count]
            .iter()
            .filter(|sample| {
                let activations = self.forward(&sample.input);
                let predicted = argmax(
                    activations
                        .last()
                        .expect("activations start with the input"),
                );
                let expected = match &sample.label {
                    Label::Class(class) => *class,
                    Label::Values(values) => argmax(values),
                };
                predicted == expected
            })
            .count();
        100.0 * correct as f64 / count as f64
    }

    /// Snapshot every layer's parameters, in layer order.
    pub fn layer_states(&self) -> Vec<LayerState> {
        self.layers.iter().map(|layer| layer.state()).collect()
    }

    /// Save all layer parameters under the default weights file name.
    pub fn save_weights(&self) -> Result<(), Box<dyn Error>> {
        self.save_weights_to(DEFAULT_WEIGHTS_PATH)
    }

    /// Save all layer parameters to `path`.
    pub fn save_weights_to(&self, path: &str) -> Result<(), Box<dyn Error>> {
        checkpoint::save_states(&self.layer_states(), path)
    }

    /// Restore layer parameters from the default weights file name.
    pub fn load_weights(&mut self) -> Result<(), Box<dyn Error>> {
        self.load_weights_from(DEFAULT_WEIGHTS_PATH)
    }

    /// Restore layer parameters from `path`.
    ///
    /// Entries are matched to layers by position; non-trainable layers
    /// ignore their marker entries. There is no schema validation beyond
    /// shape compatibility: a blob from a different architecture fails with
    /// an array-shape error, or misloads silently if shapes happen to
    /// coincide.
    pub fn load_weights_from(&mut self, path: &str) -> Result<(), Box<dyn Error>> {
        let states = checkpoint::load_states(path)?;
        for (layer, state) in self.layers.iter_mut().zip(&states) {
            layer.load_state(state);
        }
        Ok(())
    }
}
