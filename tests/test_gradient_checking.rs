// Numerical gradient checking using central finite differences.
// A fixed linear readout turns each layer's array output into a scalar
// objective J = sum(forward(x) * readout), so dJ/d(output) equals the
// readout array and every gradient a backward pass returns can be compared
// against a two-sided difference quotient.

use micronet::layers::{
    BackwardOutput, Conv2DLayer, DenseLayer, FlattenLayer, Layer, LeakyReluLayer, SigmoidLayer,
    SoftmaxLayer,
};
use micronet::losses::{CrossEntropy, Label, Loss};
use micronet::network::{Network, ParameterGradient, Sample};
use ndarray::{arr2, Array2, Array3, Array4, ArrayD};

const EPSILON: f64 = 1e-5;
const MAX_REL_ERROR: f64 = 1e-5;
const ABS_FLOOR: f64 = 1e-9;

fn readout(output: &ArrayD<f64>, weights: &ArrayD<f64>) -> f64 {
    output.iter().zip(weights.iter()).map(|(o, w)| o * w).sum()
}

fn relative_error(numerical: f64, analytical: f64) -> f64 {
    let numerator = (numerical - analytical).abs();
    let denominator = (numerical.abs() + analytical.abs()).max(1e-8);
    numerator / denominator
}

fn assert_gradients_match(numerical: &ArrayD<f64>, analytical: &ArrayD<f64>, what: &str) {
    assert_eq!(
        numerical.shape(),
        analytical.shape(),
        "{} gradient shape mismatch",
        what
    );
    for (index, (n, a)) in numerical.iter().zip(analytical.iter()).enumerate() {
        let rel_error = relative_error(*n, *a);
        assert!(
            rel_error < MAX_REL_ERROR || (n - a).abs() < ABS_FLOOR,
            "{} gradient mismatch at {}: numerical={:.12}, analytical={:.12}, rel_error={:.2e}",
            what,
            index,
            n,
            a,
            rel_error
        );
    }
}

// Perturb each input element in turn and difference the readout objective.
fn numerical_input_gradient(
    layer: &dyn Layer,
    input: &ArrayD<f64>,
    readout_weights: &ArrayD<f64>,
) -> ArrayD<f64> {
    let mut grad = ArrayD::zeros(input.raw_dim());
    for index in 0..input.len() {
        let mut plus = input.clone();
        plus.as_slice_mut().unwrap()[index] += EPSILON;
        let mut minus = input.clone();
        minus.as_slice_mut().unwrap()[index] -= EPSILON;

        let delta = readout(&layer.forward(&plus), readout_weights)
            - readout(&layer.forward(&minus), readout_weights);
        grad.as_slice_mut().unwrap()[index] = delta / (2.0 * EPSILON);
    }
    grad
}

fn analytic_backward(
    layer: &dyn Layer,
    input: &ArrayD<f64>,
    readout_weights: &ArrayD<f64>,
) -> (ArrayD<f64>, Option<(ArrayD<f64>, ArrayD<f64>)>) {
    match layer.backward(readout_weights, input) {
        BackwardOutput::InputGradient(grad) => (grad, None),
        BackwardOutput::Gradients {
            input,
            weights,
            bias,
        } => (input, Some((weights, bias))),
    }
}

// ============================================================================
// Dense layer
// ============================================================================

fn dense_fixture() -> (Array2<f64>, Array2<f64>, ArrayD<f64>, ArrayD<f64>) {
    let weights = arr2(&[[0.5, -0.3, 0.8], [0.2, 0.7, -0.6]]);
    let bias = arr2(&[[0.1], [-0.2]]);
    let input = arr2(&[[0.4], [-1.2], [0.9]]).into_dyn();
    let readout_weights = arr2(&[[1.3], [-0.7]]).into_dyn();
    (weights, bias, input, readout_weights)
}

#[test]
fn test_dense_input_gradient_matches_finite_difference() {
    let (weights, bias, input, readout_weights) = dense_fixture();
    let layer = DenseLayer::with_parameters(weights, bias);

    let numerical = numerical_input_gradient(&layer, &input, &readout_weights);
    let (analytical, _) = analytic_backward(&layer, &input, &readout_weights);

    assert_gradients_match(&numerical, &analytical, "dense input");
}

#[test]
fn test_dense_weight_gradient_matches_finite_difference() {
    let (weights, bias, input, readout_weights) = dense_fixture();
    let layer = DenseLayer::with_parameters(weights.clone(), bias.clone());
    let (_, params) = analytic_backward(&layer, &input, &readout_weights);
    let (analytic_weights, _) = params.expect("dense is trainable");

    let mut numerical = Array2::zeros(weights.dim());
    for ((row, col), slot) in numerical.indexed_iter_mut() {
        let mut plus = weights.clone();
        plus[[row, col]] += EPSILON;
        let mut minus = weights.clone();
        minus[[row, col]] -= EPSILON;

        let j_plus = readout(
            &DenseLayer::with_parameters(plus, bias.clone()).forward(&input),
            &readout_weights,
        );
        let j_minus = readout(
            &DenseLayer::with_parameters(minus, bias.clone()).forward(&input),
            &readout_weights,
        );
        *slot = (j_plus - j_minus) / (2.0 * EPSILON);
    }

    assert_gradients_match(&numerical.into_dyn(), &analytic_weights, "dense weight");
}

#[test]
fn test_dense_bias_gradient_matches_finite_difference() {
    let (weights, bias, input, readout_weights) = dense_fixture();
    let layer = DenseLayer::with_parameters(weights.clone(), bias.clone());
    let (_, params) = analytic_backward(&layer, &input, &readout_weights);
    let (_, analytic_bias) = params.expect("dense is trainable");

    let mut numerical = Array2::zeros(bias.dim());
    for ((row, col), slot) in numerical.indexed_iter_mut() {
        let mut plus = bias.clone();
        plus[[row, col]] += EPSILON;
        let mut minus = bias.clone();
        minus[[row, col]] -= EPSILON;

        let j_plus = readout(
            &DenseLayer::with_parameters(weights.clone(), plus).forward(&input),
            &readout_weights,
        );
        let j_minus = readout(
            &DenseLayer::with_parameters(weights.clone(), minus).forward(&input),
            &readout_weights,
        );
        *slot = (j_plus - j_minus) / (2.0 * EPSILON);
    }

    assert_gradients_match(&numerical.into_dyn(), &analytic_bias, "dense bias");
}

// ============================================================================
// Conv2D layer
// ============================================================================

fn conv_fixture() -> (Array4<f64>, Array3<f64>, ArrayD<f64>, ArrayD<f64>) {
    // Deterministic, non-symmetric values away from any kink.
    let kernels =
        Array4::from_shape_fn((2, 3, 3, 2), |(i, a, b, j)| {
            ((1 + i * 7 + a * 3 + b * 5 + j * 11) as f64 * 0.37).sin() * 0.5
        });
    let bias = Array3::from_shape_fn((2, 2, 2), |(a, b, i)| {
        ((a * 2 + b * 3 + i * 5) as f64 * 0.23).cos() * 0.1
    });
    let input = Array3::from_shape_fn((4, 4, 2), |(a, b, j)| {
        ((a * 5 + b * 7 + j * 13) as f64 * 0.29).sin()
    })
    .into_dyn();
    let readout_weights = Array3::from_shape_fn((2, 2, 2), |(a, b, i)| {
        ((2 + a * 3 + b * 5 + i * 7) as f64 * 0.31).cos()
    })
    .into_dyn();
    (kernels, bias, input, readout_weights)
}

#[test]
fn test_conv2d_input_gradient_matches_finite_difference() {
    let (kernels, bias, input, readout_weights) = conv_fixture();
    let layer = Conv2DLayer::with_parameters(kernels, bias);

    let numerical = numerical_input_gradient(&layer, &input, &readout_weights);
    let (analytical, _) = analytic_backward(&layer, &input, &readout_weights);

    assert_gradients_match(&numerical, &analytical, "conv2d input");
}

#[test]
fn test_conv2d_kernel_gradient_matches_finite_difference() {
    let (kernels, bias, input, readout_weights) = conv_fixture();
    let layer = Conv2DLayer::with_parameters(kernels.clone(), bias.clone());
    let (_, params) = analytic_backward(&layer, &input, &readout_weights);
    let (analytic_kernels, _) = params.expect("conv2d is trainable");

    let mut numerical = Array4::zeros(kernels.dim());
    for ((i, a, b, j), slot) in numerical.indexed_iter_mut() {
        let mut plus = kernels.clone();
        plus[[i, a, b, j]] += EPSILON;
        let mut minus = kernels.clone();
        minus[[i, a, b, j]] -= EPSILON;

        let j_plus = readout(
            &Conv2DLayer::with_parameters(plus, bias.clone()).forward(&input),
            &readout_weights,
        );
        let j_minus = readout(
            &Conv2DLayer::with_parameters(minus, bias.clone()).forward(&input),
            &readout_weights,
        );
        *slot = (j_plus - j_minus) / (2.0 * EPSILON);
    }

    assert_gradients_match(&numerical.into_dyn(), &analytic_kernels, "conv2d kernel");
}

#[test]
fn test_conv2d_bias_gradient_matches_finite_difference() {
    let (kernels, bias, input, readout_weights) = conv_fixture();
    let layer = Conv2DLayer::with_parameters(kernels.clone(), bias.clone());
    let (_, params) = analytic_backward(&layer, &input, &readout_weights);
    let (_, analytic_bias) = params.expect("conv2d is trainable");

    let mut numerical = Array3::zeros(bias.dim());
    for ((a, b, i), slot) in numerical.indexed_iter_mut() {
        let mut plus = bias.clone();
        plus[[a, b, i]] += EPSILON;
        let mut minus = bias.clone();
        minus[[a, b, i]] -= EPSILON;

        let j_plus = readout(
            &Conv2DLayer::with_parameters(kernels.clone(), plus).forward(&input),
            &readout_weights,
        );
        let j_minus = readout(
            &Conv2DLayer::with_parameters(kernels.clone(), minus).forward(&input),
            &readout_weights,
        );
        *slot = (j_plus - j_minus) / (2.0 * EPSILON);
    }

    assert_gradients_match(&numerical.into_dyn(), &analytic_bias, "conv2d bias");
}

// ============================================================================
// Activations and flatten
// ============================================================================

#[test]
fn test_leaky_relu_gradient_matches_finite_difference() {
    let layer = LeakyReluLayer::default();
    // Values far from the kink at zero; finite differences straddle it otherwise.
    let input = arr2(&[[0.5], [-0.8], [1.2], [-0.3]]).into_dyn();
    let readout_weights = arr2(&[[0.9], [-1.4], [0.6], [1.1]]).into_dyn();

    let numerical = numerical_input_gradient(&layer, &input, &readout_weights);
    let (analytical, _) = analytic_backward(&layer, &input, &readout_weights);

    assert_gradients_match(&numerical, &analytical, "leaky relu input");
}

#[test]
fn test_sigmoid_gradient_matches_finite_difference() {
    let layer = SigmoidLayer;
    let input = arr2(&[[0.5], [-1.5], [2.0], [-0.2]]).into_dyn();
    let readout_weights = arr2(&[[1.0], [-0.5], [0.8], [1.6]]).into_dyn();

    let numerical = numerical_input_gradient(&layer, &input, &readout_weights);
    let (analytical, _) = analytic_backward(&layer, &input, &readout_weights);

    assert_gradients_match(&numerical, &analytical, "sigmoid input");
}

#[test]
fn test_flatten_gradient_matches_finite_difference() {
    let layer = FlattenLayer;
    let input = Array3::from_shape_fn((2, 3, 2), |(a, b, c)| {
        ((1 + a * 2 + b * 3 + c * 5) as f64) * 0.1
    })
    .into_dyn();
    let readout_weights = Array2::from_shape_fn((12, 1), |(r, _)| ((r + 1) as f64) * 0.2).into_dyn();

    let numerical = numerical_input_gradient(&layer, &input, &readout_weights);
    let (analytical, _) = analytic_backward(&layer, &input, &readout_weights);

    assert_gradients_match(&numerical, &analytical, "flatten input");
}

// ============================================================================
// Softmax + cross-entropy composition
// ============================================================================

// Softmax alone has an identity backward, so only the composition with the
// cross-entropy loss yields the true gradient. Check the pair end to end.
#[test]
fn test_softmax_cross_entropy_composition_matches_finite_difference() {
    let softmax = SoftmaxLayer;
    let loss = CrossEntropy;
    let logits = arr2(&[[0.5], [-1.2], [2.0]]).into_dyn();
    let target = Label::Class(2);

    let probabilities = softmax.forward(&logits);
    let upstream = loss.backward(&probabilities, &target);
    let analytical = match softmax.backward(&upstream, &logits) {
        BackwardOutput::InputGradient(grad) => grad,
        BackwardOutput::Gradients { .. } => panic!("softmax owns no parameters"),
    };

    let mut numerical = ArrayD::zeros(logits.raw_dim());
    for index in 0..logits.len() {
        let mut plus = logits.clone();
        plus.as_slice_mut().unwrap()[index] += EPSILON;
        let mut minus = logits.clone();
        minus.as_slice_mut().unwrap()[index] -= EPSILON;

        let j_plus = loss.forward(&softmax.forward(&plus), &target);
        let j_minus = loss.forward(&softmax.forward(&minus), &target);
        numerical.as_slice_mut().unwrap()[index] = (j_plus - j_minus) / (2.0 * EPSILON);
    }

    assert_gradients_match(&numerical, &analytical, "softmax+cross-entropy");
}

// ============================================================================
// Whole-network backpropagation
// ============================================================================

// Finite-difference the first dense layer's parameters through a full
// dense -> leaky ReLU -> dense -> softmax -> cross-entropy stack and compare
// against the records Network::gradient returns.
#[test]
fn test_network_gradient_matches_finite_difference() {
    let w1 = arr2(&[[0.3, -0.5, 0.2], [0.8, 0.1, -0.4]]);
    let b1 = arr2(&[[0.1], [-0.2]]);
    let w2 = arr2(&[[0.6, -0.2], [-0.3, 0.9]]);
    let b2 = arr2(&[[0.05], [-0.05]]);
    let sample = Sample {
        input: arr2(&[[0.7], [-0.4], [1.1]]).into_dyn(),
        label: Label::Class(0),
    };

    let build = |w1: &Array2<f64>, b1: &Array2<f64>| -> Network {
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(DenseLayer::with_parameters(w1.clone(), b1.clone())),
            Box::new(LeakyReluLayer::default()),
            Box::new(DenseLayer::with_parameters(w2.clone(), b2.clone())),
            Box::new(SoftmaxLayer),
        ];
        Network::new(layers, Box::new(CrossEntropy), 10)
    };

    let records = build(&w1, &b1).gradient(&sample);
    assert_eq!(records.len(), 4);
    let (analytic_w1, analytic_b1) = match &records[0] {
        ParameterGradient::Parameters { weights, bias } => (weights.clone(), bias.clone()),
        ParameterGradient::NoParams => panic!("first dense layer is trainable"),
    };

    let mut numerical_w1 = Array2::zeros(w1.dim());
    for ((row, col), slot) in numerical_w1.indexed_iter_mut() {
        let mut plus = w1.clone();
        plus[[row, col]] += EPSILON;
        let mut minus = w1.clone();
        minus[[row, col]] -= EPSILON;

        let loss_plus = build(&plus, &b1).evaluate(&sample).1;
        let loss_minus = build(&minus, &b1).evaluate(&sample).1;
        *slot = (loss_plus - loss_minus) / (2.0 * EPSILON);
    }
    assert_gradients_match(&numerical_w1.into_dyn(), &analytic_w1, "network dense weight");

    let mut numerical_b1 = Array2::zeros(b1.dim());
    for ((row, col), slot) in numerical_b1.indexed_iter_mut() {
        let mut plus = b1.clone();
        plus[[row, col]] += EPSILON;
        let mut minus = b1.clone();
        minus[[row, col]] -= EPSILON;

        let loss_plus = build(&w1, &plus).evaluate(&sample).1;
        let loss_minus = build(&w1, &minus).evaluate(&sample).1;
        *slot = (loss_plus - loss_minus) / (2.0 * EPSILON);
    }
    assert_gradients_match(&numerical_b1.into_dyn(), &analytic_b1, "network dense bias");
}

// Same check through the convolutional path: conv -> flatten -> dense ->
// softmax -> cross-entropy, differencing the conv kernels.
#[test]
fn test_conv_network_gradient_matches_finite_difference() {
    let kernels = Array4::from_shape_fn((2, 2, 2, 1), |(i, a, b, _)| {
        ((1 + i * 5 + a * 3 + b * 7) as f64 * 0.41).sin() * 0.6
    });
    let conv_bias = Array3::from_shape_fn((3, 3, 2), |(a, b, i)| {
        ((a + b * 2 + i * 3) as f64 * 0.19).cos() * 0.05
    });
    let dense_weights = Array2::from_shape_fn((2, 18), |(r, c)| {
        ((1 + r * 13 + c * 3) as f64 * 0.27).sin() * 0.4
    });
    let dense_bias = arr2(&[[0.02], [-0.03]]);
    let sample = Sample {
        input: Array3::from_shape_fn((4, 4, 1), |(a, b, _)| ((a * 4 + b) as f64 * 0.33).sin())
            .into_dyn(),
        label: Label::Class(1),
    };

    let build = |kernels: &Array4<f64>| -> Network {
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Conv2DLayer::with_parameters(
                kernels.clone(),
                conv_bias.clone(),
            )),
            Box::new(FlattenLayer),
            Box::new(DenseLayer::with_parameters(
                dense_weights.clone(),
                dense_bias.clone(),
            )),
            Box::new(SoftmaxLayer),
        ];
        Network::new(layers, Box::new(CrossEntropy), 10)
    };

    let records = build(&kernels).gradient(&sample);
    let analytic_kernels = match &records[0] {
        ParameterGradient::Parameters { weights, .. } => weights.clone(),
        ParameterGradient::NoParams => panic!("conv layer is trainable"),
    };

    let mut numerical = Array4::zeros(kernels.dim());
    for ((i, a, b, j), slot) in numerical.indexed_iter_mut() {
        let mut plus = kernels.clone();
        plus[[i, a, b, j]] += EPSILON;
        let mut minus = kernels.clone();
        minus[[i, a, b, j]] -= EPSILON;

        let loss_plus = build(&plus).evaluate(&sample).1;
        let loss_minus = build(&minus).evaluate(&sample).1;
        *slot = (loss_plus - loss_minus) / (2.0 * EPSILON);
    }

    assert_gradients_match(&numerical.into_dyn(), &analytic_kernels, "network conv kernel");
}
