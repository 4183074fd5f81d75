//! Layer trait definition
//!
//! This module defines the core Layer trait that all layer types implement.
//! The trait fixes the forward/backward data flow the network relies on:
//! every layer transforms an input array into an output array, and maps an
//! upstream gradient back to an input gradient (plus parameter gradients for
//! trainable layers).

use ndarray::ArrayD;

use crate::checkpoint::LayerState;

/// Result of a layer's backward pass.
///
/// Layers without parameters return only the gradient with respect to their
/// input. Trainable layers additionally return the gradients for their
/// weights and bias, shape-matched to the parameters they update.
#[derive(Debug, Clone)]
pub enum BackwardOutput {
    /// Gradient with respect to the layer input.
    InputGradient(ArrayD<f64>),
    /// Input gradient plus parameter gradients.
    Gradients {
        input: ArrayD<f64>,
        weights: ArrayD<f64>,
        bias: ArrayD<f64>,
    },
}

/// Core trait for network layers.
///
/// All layer types (Dense, Conv2D, activations, Flatten, Identity) implement
/// this trait to provide a uniform interface for forward and backward
/// propagation. Layers work with dynamic-rank `f64` arrays at the trait
/// boundary and convert to their fixed-rank shapes internally; a wrong-rank
/// or wrong-shape input surfaces as an array error and aborts the call.
pub trait Layer {
    /// Forward propagation: compute the layer output for `input`.
    fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64>;

    /// Backward propagation: map `grad_output` (gradient of the cost with
    /// respect to this layer's output) to gradients for the input and, for
    /// trainable layers, the parameters.
    ///
    /// `input` must be the original forward input for this layer, cached by
    /// the caller. Several backward formulas need the untransformed input
    /// (the leaky-ReLU mask, the convolution correlations, the dense outer
    /// product), so passing the output instead silently corrupts gradients.
    fn backward(&self, grad_output: &ArrayD<f64>, input: &ArrayD<f64>) -> BackwardOutput;

    /// Whether the layer owns parameters updated by training. Fixed at
    /// construction.
    fn trainable(&self) -> bool {
        false
    }

    /// Apply `parameter -= gradient * scale` to weights and bias.
    ///
    /// `scale` is the learning rate already divided by the batch size, so
    /// gradient averaging stays the caller's concern. Default is a no-op for
    /// layers without parameters.
    fn update_parameters(
        &mut self,
        weight_grad: &ArrayD<f64>,
        bias_grad: &ArrayD<f64>,
        scale: f64,
    ) {
        let _ = (weight_grad, bias_grad, scale);
    }

    /// Snapshot the layer's parameters for persistence.
    fn state(&self) -> LayerState {
        LayerState::NotTrainable
    }

    /// Overwrite the layer's parameters from a stored snapshot. Layers
    /// without parameters ignore the entry.
    fn load_state(&mut self, state: &LayerState) {
        let _ = state;
    }

    /// Number of trainable parameters in the layer.
    fn parameter_count(&self) -> usize {
        0
    }
}
