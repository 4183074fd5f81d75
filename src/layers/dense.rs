//! Dense (fully connected) layer implementation
//!
//! This module provides a DenseLayer that performs the affine transformation
//! `output = weights · input + bias` on column-vector activations.

use ndarray::{Array2, ArrayD, Ix2};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::checkpoint::LayerState;
use crate::layers::{BackwardOutput, Layer};

/// Dense (fully connected) layer with weights and biases.
///
/// Activations are column vectors: the input has shape `[inputs, 1]` and the
/// output `[outputs, 1]`. The weight matrix has shape `[outputs, inputs]`
/// and the bias `[outputs, 1]`.
///
/// # Example
///
/// ```
/// use micronet::layers::DenseLayer;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let layer = DenseLayer::new(784, 128, &mut rng);
/// assert_eq!(layer.input_size(), 784);
/// assert_eq!(layer.output_size(), 128);
/// ```
pub struct DenseLayer {
    weights: Array2<f64>,
    bias: Array2<f64>,
}

impl DenseLayer {
    /// Create a new DenseLayer with variance-scaled initialization.
    ///
    /// Weights are sampled from a zero-mean normal distribution scaled by
    /// `sqrt(1 / inputs)`, keeping activation variance roughly constant
    /// across layers. Biases start at zero.
    pub fn new<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let scale = (1.0 / inputs as f64).sqrt();
        let weights = Array2::<f64>::random_using((outputs, inputs), StandardNormal, rng) * scale;

        Self {
            weights,
            bias: Array2::zeros((outputs, 1)),
        }
    }

    /// Create a DenseLayer from explicit parameters.
    ///
    /// Used by drivers restoring known weights and by tests that need a
    /// deterministic layer.
    ///
    /// # Panics
    ///
    /// Panics if `bias` is not a `[outputs, 1]` column matching `weights`.
    pub fn with_parameters(weights: Array2<f64>, bias: Array2<f64>) -> Self {
        assert_eq!(
            bias.dim(),
            (weights.nrows(), 1),
            "bias must be a column vector with one entry per output"
        );
        Self { weights, bias }
    }

    /// Number of input features.
    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Number of output features.
    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    /// Current weight matrix, `[outputs, inputs]`.
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Current bias column, `[outputs, 1]`.
    pub fn bias(&self) -> &Array2<f64> {
        &self.bias
    }
}

impl Layer for DenseLayer {
    fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64> {
        let x = input
            .view()
            .into_dimensionality::<Ix2>()
            .expect("dense forward expects a column-vector input");
        (self.weights.dot(&x) + &self.bias).into_dyn()
    }

    fn backward(&self, grad_output: &ArrayD<f64>, input: &ArrayD<f64>) -> BackwardOutput {
        let x = input
            .view()
            .into_dimensionality::<Ix2>()
            .expect("dense backward expects a column-vector input");
        let g = grad_output
            .view()
            .into_dimensionality::<Ix2>()
            .expect("dense backward expects a column-vector gradient");

        BackwardOutput::Gradients {
            input: self.weights.t().dot(&g).into_dyn(),
            weights: g.dot(&x.t()).into_dyn(),
            bias: grad_output.clone(),
        }
    }

    fn trainable(&self) -> bool {
        true
    }

    fn update_parameters(
        &mut self,
        weight_grad: &ArrayD<f64>,
        bias_grad: &ArrayD<f64>,
        scale: f64,
    ) {
        let dw = weight_grad
            .view()
            .into_dimensionality::<Ix2>()
            .expect("dense weight gradient must be 2-D");
        let db = bias_grad
            .view()
            .into_dimensionality::<Ix2>()
            .expect("dense bias gradient must be 2-D");
        self.weights.scaled_add(-scale, &dw);
        self.bias.scaled_add(-scale, &db);
    }

    fn state(&self) -> LayerState {
        LayerState::Parameters {
            weights: self.weights.clone().into_dyn(),
            bias: self.bias.clone().into_dyn(),
        }
    }

    fn load_state(&mut self, state: &LayerState) {
        match state {
            LayerState::Parameters { weights, bias } => {
                self.weights.assign(
                    &weights
                        .view()
                        .into_dimensionality::<Ix2>()
                        .expect("stored dense weights must be 2-D"),
                );
                self.bias.assign(
                    &bias
                        .view()
                        .into_dimensionality::<Ix2>()
                        .expect("stored dense bias must be 2-D"),
                );
            }
            LayerState::NotTrainable => {
                panic!("checkpoint entry for a dense layer carries no parameters")
            }
        }
    }

    fn parameter_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }
}
