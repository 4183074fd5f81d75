//! Identity layer: forward and backward are no-ops.

use ndarray::ArrayD;

use crate::layers::{BackwardOutput, Layer};

/// Passthrough layer returning its argument unchanged in both directions.
pub struct IdentityLayer;

impl Layer for IdentityLayer {
    fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64> {
        input.clone()
    }

    fn backward(&self, grad_output: &ArrayD<f64>, _input: &ArrayD<f64>) -> BackwardOutput {
        BackwardOutput::InputGradient(grad_output.clone())
    }
}
