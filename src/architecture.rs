//! Architecture configuration structures
//!
//! This module builds networks from JSON configuration files, so layer
//! stacks can be changed without touching code. A configuration names the
//! layer sequence and the loss; validation checks each layer's parameters
//! and that the flattened element counts chain consistently from one sized
//! layer to the next.

use serde::Deserialize;
use std::error::Error;
use std::fs;

use rand::Rng;

use crate::layers::{
    Conv2DLayer, DenseLayer, FlattenLayer, IdentityLayer, Layer, LeakyReluLayer, SigmoidLayer,
    SoftmaxLayer,
};
use crate::losses::{CrossEntropy, Loss, MeanSquaredError};
use crate::network::Network;

fn default_alpha() -> f64 {
    0.1
}

/// Configuration for a single layer.
///
/// The JSON encoding is tagged by `layer_type`:
///
/// ```json
/// { "layer_type": "dense", "inputs": 784, "outputs": 128 }
/// ```
///
/// ```json
/// {
///   "layer_type": "conv2d",
///   "input_height": 28,
///   "input_width": 28,
///   "in_channels": 1,
///   "kernel_size": 3,
///   "out_channels": 8
/// }
/// ```
///
/// Activation, flatten, and identity layers take no parameters beyond the
/// optional `alpha` on `leaky_relu` (default 0.1).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "layer_type", rename_all = "snake_case")]
pub enum LayerConfig {
    Dense {
        inputs: usize,
        outputs: usize,
    },
    Conv2d {
        input_height: usize,
        input_width: usize,
        in_channels: usize,
        kernel_size: usize,
        out_channels: usize,
    },
    LeakyRelu {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    Sigmoid,
    Softmax,
    Flatten,
    Identity,
}

/// Which loss scores the final activation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossConfig {
    MeanSquaredError,
    CrossEntropy,
}

/// Configuration for the entire network.
///
/// # Example
///
/// ```json
/// {
///   "layers": [
///     { "layer_type": "dense", "inputs": 2, "outputs": 8 },
///     { "layer_type": "leaky_relu" },
///     { "layer_type": "dense", "inputs": 8, "outputs": 2 },
///     { "layer_type": "softmax" }
///   ],
///   "loss": "cross_entropy"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Layer sequence, applied in order.
    pub layers: Vec<LayerConfig>,
    /// Loss paired with the final layer.
    pub loss: LossConfig,
}

fn invalid(message: String) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

/// Loads and validates an architecture configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use micronet::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/toy.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

/// Declared (input, output) element counts of a layer; `None` means the
/// layer keeps whatever count it receives.
fn layer_sizes(layer: &LayerConfig) -> (Option<usize>, Option<usize>) {
    match layer {
        LayerConfig::Dense { inputs, outputs } => (Some(*inputs), Some(*outputs)),
        LayerConfig::Conv2d {
            input_height,
            input_width,
            in_channels,
            kernel_size,
            out_channels,
        } => (
            Some(input_height * input_width * in_channels),
            Some(
                (input_height - kernel_size + 1) * (input_width - kernel_size + 1) * out_channels,
            ),
        ),
        _ => (None, None),
    }
}

fn validate_layer(layer: &LayerConfig, index: usize) -> Result<(), Box<dyn Error>> {
    match layer {
        LayerConfig::Dense { inputs, outputs } => {
            if *inputs == 0 {
                return Err(invalid(format!("layer {index}: inputs must be greater than 0")));
            }
            if *outputs == 0 {
                return Err(invalid(format!(
                    "layer {index}: outputs must be greater than 0"
                )));
            }
        }
        LayerConfig::Conv2d {
            input_height,
            input_width,
            in_channels,
            kernel_size,
            out_channels,
        } => {
            for (name, value) in [
                ("input_height", *input_height),
                ("input_width", *input_width),
                ("in_channels", *in_channels),
                ("kernel_size", *kernel_size),
                ("out_channels", *out_channels),
            ] {
                if value == 0 {
                    return Err(invalid(format!(
                        "layer {index}: {name} must be greater than 0"
                    )));
                }
            }
            if kernel_size > input_height || kernel_size > input_width {
                return Err(invalid(format!(
                    "layer {index}: kernel size {} does not fit {}x{} input",
                    kernel_size, input_height, input_width
                )));
            }
        }
        LayerConfig::LeakyRelu { alpha } => {
            if *alpha < 0.0 {
                return Err(invalid(format!(
                    "layer {index}: alpha must be non-negative"
                )));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Validates an architecture configuration.
///
/// Checks that the architecture has at least one layer, that each layer's
/// parameters are in range, and that the flattened output count of each
/// sized layer matches the next sized layer's input count.
fn validate_architecture(config: &ArchitectureConfig) -> Result<(), Box<dyn Error>> {
    if config.layers.is_empty() {
        return Err(invalid(
            "architecture must have at least one layer".to_string(),
        ));
    }

    for (index, layer) in config.layers.iter().enumerate() {
        validate_layer(layer, index)?;
    }

    let mut current: Option<usize> = None;
    for (index, layer) in config.layers.iter().enumerate() {
        let (declared_input, declared_output) = layer_sizes(layer);
        if let (Some(expected), Some(previous)) = (declared_input, current) {
            if expected != previous {
                return Err(invalid(format!(
                    "layer connection mismatch: layer {} expects {} inputs but receives {}",
                    index, expected, previous
                )));
            }
        }
        if let Some(output) = declared_output {
            current = Some(output);
        }
    }

    Ok(())
}

/// Builds the layer sequence described by `config`.
///
/// Parameterized layers are initialized with the provided RNG, in
/// configuration order, so a fixed seed reproduces the same network.
pub fn build_layers<R: Rng>(config: &ArchitectureConfig, rng: &mut R) -> Vec<Box<dyn Layer>> {
    config
        .layers
        .iter()
        .map(|layer| -> Box<dyn Layer> {
            match layer {
                LayerConfig::Dense { inputs, outputs } => {
                    Box::new(DenseLayer::new(*inputs, *outputs, rng))
                }
                LayerConfig::Conv2d {
                    input_height,
                    input_width,
                    in_channels,
                    kernel_size,
                    out_channels,
                } => Box::new(Conv2DLayer::new(
                    (*input_height, *input_width, *in_channels),
                    *kernel_size,
                    *out_channels,
                    rng,
                )),
                LayerConfig::LeakyRelu { alpha } => Box::new(LeakyReluLayer::new(*alpha)),
                LayerConfig::Sigmoid => Box::new(SigmoidLayer),
                LayerConfig::Softmax => Box::new(SoftmaxLayer),
                LayerConfig::Flatten => Box::new(FlattenLayer),
                LayerConfig::Identity => Box::new(IdentityLayer),
            }
        })
        .collect()
}

/// Builds the loss described by `config`.
pub fn build_loss(config: &LossConfig) -> Box<dyn Loss> {
    match config {
        LossConfig::MeanSquaredError => Box::new(MeanSquaredError),
        LossConfig::CrossEntropy => Box::new(CrossEntropy),
    }
}

/// Validates `config` and builds the full network.
pub fn build_network<R: Rng>(
    config: &ArchitectureConfig,
    eval_samples: usize,
    rng: &mut R,
) -> Result<Network, Box<dyn Error>> {
    validate_architecture(config)?;
    Ok(Network::new(
        build_layers(config, rng),
        build_loss(&config.loss),
        eval_samples,
    ))
}
