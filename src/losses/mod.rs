//! Loss functions
//!
//! A loss scores the network's final activation against a target and
//! produces the gradient that seeds backpropagation. Losses are stateless;
//! the target type depends on the variant (class index for cross-entropy,
//! matching-shape array for mean-squared-error).

pub mod cross_entropy;
pub mod mse;

pub use cross_entropy::CrossEntropy;
pub use mse::MeanSquaredError;

use ndarray::ArrayD;

/// Training target for one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// Class index, consumed by sparse categorical cross-entropy.
    Class(usize),
    /// Expected output array, consumed by mean-squared-error.
    Values(ArrayD<f64>),
}

/// Core trait for loss functions.
///
/// Passing the wrong `Label` variant for a loss is a programming error and
/// panics; there is nothing sensible to recover to mid-training.
pub trait Loss {
    /// Scalar cost of `output` against `target`.
    fn forward(&self, output: &ArrayD<f64>, target: &Label) -> f64;

    /// Gradient of the cost with respect to `output`.
    fn backward(&self, output: &ArrayD<f64>, target: &Label) -> ArrayD<f64>;
}
