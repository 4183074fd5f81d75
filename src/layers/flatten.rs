//! Flatten layer implementation
//!
//! Reshapes any-rank feature maps into column vectors so convolutional
//! outputs can feed dense layers. The backward pass restores the cached
//! input's shape.

use ndarray::{Array2, ArrayD};

use crate::layers::{BackwardOutput, Layer};

/// Reshape an arbitrary-rank input into a `[numel, 1]` column vector,
/// preserving logical element order.
pub struct FlattenLayer;

impl Layer for FlattenLayer {
    fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64> {
        let values: Vec<f64> = input.iter().copied().collect();
        let count = values.len();
        Array2::from_shape_vec((count, 1), values)
            .expect("column shape matches element count")
            .into_dyn()
    }

    fn backward(&self, grad_output: &ArrayD<f64>, input: &ArrayD<f64>) -> BackwardOutput {
        let values: Vec<f64> = grad_output.iter().copied().collect();
        let grad = ArrayD::from_shape_vec(input.raw_dim(), values)
            .expect("gradient has as many elements as the cached input");
        BackwardOutput::InputGradient(grad)
    }
}
