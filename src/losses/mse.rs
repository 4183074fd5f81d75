//! Mean-squared-error loss

use ndarray::ArrayD;

use crate::losses::{Label, Loss};

/// Mean of the squared elementwise difference between output and target.
///
/// The backward pass returns `2 * (output - target)` with no `1/n` factor:
/// the averaging convention lives in the batch update, matching the training
/// loop this loss is paired with.
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn forward(&self, output: &ArrayD<f64>, target: &Label) -> f64 {
        let target = expect_values(target);
        let diff = output - target;
        diff.mapv(|d| d * d).mean().unwrap_or(0.0)
    }

    fn backward(&self, output: &ArrayD<f64>, target: &Label) -> ArrayD<f64> {
        let target = expect_values(target);
        (output - target) * 2.0
    }
}

fn expect_values(target: &Label) -> &ArrayD<f64> {
    match target {
        Label::Values(values) => values,
        Label::Class(_) => panic!("mean squared error requires an array target"),
    }
}
