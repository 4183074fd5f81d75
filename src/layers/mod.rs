//! Layer abstractions for sequential networks
//!
//! This module provides the Layer trait and the layer variants the network
//! container composes: dense and convolutional parameterized layers,
//! elementwise activations, flatten, and an identity passthrough.

mod r#trait;
pub mod activations;
pub mod conv2d;
pub mod dense;
pub mod flatten;
pub mod identity;

// Re-export the Layer contract and all variants for convenience
pub use r#trait::{BackwardOutput, Layer};

pub use activations::{LeakyReluLayer, SigmoidLayer, SoftmaxLayer};
pub use conv2d::Conv2DLayer;
pub use dense::DenseLayer;
pub use flatten::FlattenLayer;
pub use identity::IdentityLayer;
