//! Activation layers
//!
//! Elementwise nonlinearities wrapped as layers so they slot into the same
//! sequential forward/backward protocol as the parameterized layers:
//! - LeakyRelu: identity above zero, small slope below
//! - Sigmoid: logistic squashing
//! - Softmax: probability normalization, identity backward (see below)

use ndarray::{ArrayD, Zip};

use crate::layers::{BackwardOutput, Layer};

/// Leaky rectified linear unit: `x` for `x >= 0`, `alpha * x` below.
///
/// The backward mask is derived from the forward *input*, not the output.
pub struct LeakyReluLayer {
    alpha: f64,
}

impl LeakyReluLayer {
    /// # Panics
    ///
    /// Panics if `alpha` is negative.
    pub fn new(alpha: f64) -> Self {
        assert!(alpha >= 0.0, "leaky ReLU slope must be non-negative");
        Self { alpha }
    }

    /// Negative-side slope.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for LeakyReluLayer {
    /// Slope 0.1 on the negative side.
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl Layer for LeakyReluLayer {
    fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64> {
        input.mapv(|x| if x >= 0.0 { x } else { self.alpha * x })
    }

    fn backward(&self, grad_output: &ArrayD<f64>, input: &ArrayD<f64>) -> BackwardOutput {
        let mut grad = grad_output.clone();
        Zip::from(&mut grad).and(input).for_each(|g, &x| {
            if x < 0.0 {
                *g *= self.alpha;
            }
        });
        BackwardOutput::InputGradient(grad)
    }
}

/// Logistic sigmoid: `1 / (1 + exp(-x))`.
pub struct SigmoidLayer;

impl Layer for SigmoidLayer {
    fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64> {
        input.mapv(|x| 1.0 / (1.0 + (-x).exp()))
    }

    fn backward(&self, grad_output: &ArrayD<f64>, input: &ArrayD<f64>) -> BackwardOutput {
        // s is recomputed from the cached input; the derivative is s * (1 - s).
        let s = self.forward(input);
        let ds = s.mapv(|v| v * (1.0 - v));
        BackwardOutput::InputGradient(grad_output * &ds)
    }
}

/// Numerically-stabilized softmax over all elements.
///
/// The backward pass is an identity pass-through: the combined
/// softmax+cross-entropy gradient is computed entirely by the cross-entropy
/// loss. The end-to-end gradient is only correct when this layer is the last
/// one and is paired with that loss.
pub struct SoftmaxLayer;

impl Layer for SoftmaxLayer {
    fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64> {
        let max = input.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let exps = input.mapv(|v| (v - max).exp());
        let sum = exps.sum();
        exps / sum
    }

    fn backward(&self, grad_output: &ArrayD<f64>, _input: &ArrayD<f64>) -> BackwardOutput {
        BackwardOutput::InputGradient(grad_output.clone())
    }
}
