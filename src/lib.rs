//! Minimal neural-network training library
//!
//! This library provides the building blocks for small image-classification
//! experiments on dense `f64` arrays: layer primitives with a uniform
//! forward/backward protocol, loss functions, and a sequential network
//! container that drives inference, backpropagation, mini-batch gradient
//! descent, metrics, and weight persistence.
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (Dense, Conv2D, activations,
//!   Flatten, Identity)
//! - `losses`: Loss trait, mean-squared-error, sparse categorical
//!   cross-entropy
//! - `network`: the sequential Network container and training loop
//! - `checkpoint`: tagged per-layer weight persistence
//! - `architecture`: JSON architecture configuration and network building
//! - `config`: training hyperparameter configuration
//! - `utils`: argmax and the 2-D correlation/convolution kernels

pub mod architecture;
pub mod checkpoint;
pub mod config;
pub mod layers;
pub mod losses;
pub mod network;
pub mod utils;

// Re-export primary types
pub use checkpoint::{LayerState, DEFAULT_WEIGHTS_PATH};
pub use layers::{
    BackwardOutput, Conv2DLayer, DenseLayer, FlattenLayer, IdentityLayer, Layer, LeakyReluLayer,
    SigmoidLayer, SoftmaxLayer,
};
pub use losses::{CrossEntropy, Label, Loss, MeanSquaredError};
pub use network::{Network, ParameterGradient, Sample};
