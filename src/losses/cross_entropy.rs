//! Sparse categorical cross-entropy loss

use ndarray::ArrayD;

use crate::losses::{Label, Loss};

/// Probabilities below this floor are clamped before taking the logarithm.
const PROBABILITY_FLOOR: f64 = 1e-9;

/// Sparse categorical cross-entropy over a probability column vector.
///
/// Expects the network output to be a `[classes, 1]` column of
/// probabilities (a softmax output) and the target to be a class index.
///
/// The backward pass returns the *combined* softmax+cross-entropy gradient,
/// `output` with 1 subtracted at the target index. This is why the softmax
/// layer's own backward is an identity: the pair computes the correct
/// end-to-end gradient only when used together, with softmax as the final
/// layer.
pub struct CrossEntropy;

impl Loss for CrossEntropy {
    fn forward(&self, output: &ArrayD<f64>, target: &Label) -> f64 {
        let class = expect_class(target);
        let clipped = output.mapv(|p| p.clamp(PROBABILITY_FLOOR, 1.0));
        -clipped[[class, 0]].ln()
    }

    fn backward(&self, output: &ArrayD<f64>, target: &Label) -> ArrayD<f64> {
        let class = expect_class(target);
        let mut grad = output.clone();
        grad[[class, 0]] -= 1.0;
        grad
    }
}

fn expect_class(target: &Label) -> usize {
    match target {
        Label::Class(class) => *class,
        Label::Values(_) => panic!("cross-entropy requires a class-index target"),
    }
}
