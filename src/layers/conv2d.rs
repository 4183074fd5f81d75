//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2DLayer for multi-channel 2-D feature maps.
//! The forward pass is a valid cross-correlation per (output, input) channel
//! pair; the backward pass computes the kernel gradient as a correlation of
//! the input with the output gradient, and the input gradient as a full
//! convolution of the output gradient with the kernel.

use ndarray::{s, Array3, Array4, ArrayD, Ix3, Ix4};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::checkpoint::LayerState;
use crate::layers::{BackwardOutput, Layer};
use crate::utils::signal::{convolve2d_full, correlate2d_valid};

/// 2-D convolutional layer with learnable square kernels.
///
/// The input is a `(height, width, channels)` feature map. Kernels are
/// stored as `[out_channels, k, k, in_channels]` and the bias spans the full
/// output map `(height - k + 1, width - k + 1, out_channels)` — one bias
/// value per output element, matching the correlation-based gradient
/// formulas. No padding or striding: the output shrinks by `k - 1` per
/// spatial dimension.
///
/// # Example
///
/// ```
/// use micronet::layers::Conv2DLayer;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// // 28x28 grayscale input, 3x3 kernels, 8 output channels
/// let layer = Conv2DLayer::new((28, 28, 1), 3, 8, &mut rng);
/// assert_eq!(layer.output_shape(), (26, 26, 8));
/// ```
pub struct Conv2DLayer {
    kernels: Array4<f64>,
    bias: Array3<f64>,
}

impl Conv2DLayer {
    /// Create a new Conv2DLayer with variance-scaled initialization.
    ///
    /// Kernels are sampled from a zero-mean normal distribution scaled by
    /// `sqrt(1 / (k * k * in_channels))` (the fan-in of one output element).
    /// The bias starts at zero.
    ///
    /// # Panics
    ///
    /// Panics if the kernel does not fit the input's spatial dimensions.
    pub fn new<R: Rng>(
        input_shape: (usize, usize, usize),
        kernel_size: usize,
        out_channels: usize,
        rng: &mut R,
    ) -> Self {
        let (height, width, in_channels) = input_shape;
        assert!(
            kernel_size >= 1 && kernel_size <= height && kernel_size <= width,
            "kernel size {} does not fit {}x{} input",
            kernel_size,
            height,
            width
        );

        let fan_in = (kernel_size * kernel_size * in_channels) as f64;
        let scale = (1.0 / fan_in).sqrt();
        let kernels = Array4::<f64>::random_using(
            (out_channels, kernel_size, kernel_size, in_channels),
            StandardNormal,
            rng,
        ) * scale;
        let bias = Array3::zeros((
            height - kernel_size + 1,
            width - kernel_size + 1,
            out_channels,
        ));

        Self { kernels, bias }
    }

    /// Create a Conv2DLayer from explicit parameters.
    ///
    /// # Panics
    ///
    /// Panics if the bias channel count does not match the kernel count.
    pub fn with_parameters(kernels: Array4<f64>, bias: Array3<f64>) -> Self {
        assert_eq!(
            bias.dim().2,
            kernels.dim().0,
            "bias must have one channel per kernel"
        );
        Self { kernels, bias }
    }

    /// Kernel side length.
    pub fn kernel_size(&self) -> usize {
        self.kernels.dim().1
    }

    /// Number of input channels.
    pub fn in_channels(&self) -> usize {
        self.kernels.dim().3
    }

    /// Number of output channels.
    pub fn out_channels(&self) -> usize {
        self.kernels.dim().0
    }

    /// Output shape `(height, width, channels)`.
    pub fn output_shape(&self) -> (usize, usize, usize) {
        self.bias.dim()
    }

    /// Current kernels, `[out_channels, k, k, in_channels]`.
    pub fn kernels(&self) -> &Array4<f64> {
        &self.kernels
    }

    /// Current bias, shaped like the output map.
    pub fn bias(&self) -> &Array3<f64> {
        &self.bias
    }
}

impl Layer for Conv2DLayer {
    fn forward(&self, input: &ArrayD<f64>) -> ArrayD<f64> {
        let x = input
            .view()
            .into_dimensionality::<Ix3>()
            .expect("conv2d forward expects a (height, width, channels) input");
        let in_channels = self.in_channels();
        assert_eq!(
            x.dim().2,
            in_channels,
            "conv2d input has {} channels, layer expects {}",
            x.dim().2,
            in_channels
        );

        let mut output = self.bias.clone();
        for i in 0..self.out_channels() {
            for j in 0..in_channels {
                let channel =
                    correlate2d_valid(x.slice(s![.., .., j]), self.kernels.slice(s![i, .., .., j]));
                let mut out_channel = output.slice_mut(s![.., .., i]);
                out_channel += &channel;
            }
        }
        output.into_dyn()
    }

    fn backward(&self, grad_output: &ArrayD<f64>, input: &ArrayD<f64>) -> BackwardOutput {
        let x = input
            .view()
            .into_dimensionality::<Ix3>()
            .expect("conv2d backward expects a (height, width, channels) input");
        let g = grad_output
            .view()
            .into_dimensionality::<Ix3>()
            .expect("conv2d backward expects a (height, width, channels) gradient");

        let mut weight_grad = Array4::zeros(self.kernels.raw_dim());
        let mut input_grad = Array3::zeros(x.raw_dim());

        for i in 0..self.out_channels() {
            let g_i = g.slice(s![.., .., i]);
            for j in 0..self.in_channels() {
                weight_grad
                    .slice_mut(s![i, .., .., j])
                    .assign(&correlate2d_valid(x.slice(s![.., .., j]), g_i));

                let mut in_channel = input_grad.slice_mut(s![.., .., j]);
                in_channel += &convolve2d_full(g_i, self.kernels.slice(s![i, .., .., j]));
            }
        }

        BackwardOutput::Gradients {
            input: input_grad.into_dyn(),
            weights: weight_grad.into_dyn(),
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
        let dk = weight_grad
            .view()
            .into_dimensionality::<Ix4>()
            .expect("conv2d weight gradient must be 4-D");
        let db = bias_grad
            .view()
            .into_dimensionality::<Ix3>()
            .expect("conv2d bias gradient must be 3-D");
        self.kernels.scaled_add(-scale, &dk);
        self.bias.scaled_add(-scale, &db);
    }

    fn state(&self) -> LayerState {
        LayerState::Parameters {
            weights: self.kernels.clone().into_dyn(),
            bias: self.bias.clone().into_dyn(),
        }
    }

    fn load_state(&mut self, state: &LayerState) {
        match state {
            LayerState::Parameters { weights, bias } => {
                self.kernels.assign(
                    &weights
                        .view()
                        .into_dimensionality::<Ix4>()
                        .expect("stored conv2d kernels must be 4-D"),
                );
                self.bias.assign(
                    &bias
                        .view()
                        .into_dimensionality::<Ix3>()
                        .expect("stored conv2d bias must be 3-D"),
                );
            }
            LayerState::NotTrainable => {
                panic!("checkpoint entry for a conv2d layer carries no parameters")
            }
        }
    }

    fn parameter_count(&self) -> usize {
        self.kernels.len() + self.bias.len()
    }
}
