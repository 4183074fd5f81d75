//! Configuration structures for training
//!
//! This module parses the training hyperparameters from JSON files:
//! epoch/batch/learning-rate settings plus the evaluation-prefix size the
//! network metrics read.

use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Training hyperparameters.
///
/// # Example
///
/// ```json
/// {
///   "epochs": 20,
///   "batch_size": 32,
///   "learning_rate": 0.05,
///   "eval_samples": 1000,
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes over the training dataset.
    pub epochs: usize,

    /// Samples per gradient-descent step.
    pub batch_size: usize,

    /// Step size for the batch-averaged updates.
    pub learning_rate: f64,

    /// Number of leading training samples `average_loss`/`accuracy` read.
    pub eval_samples: usize,

    /// Seed for weight initialization and epoch shuffling; omit for seed 0.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Loads and validates a training configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use micronet::config::load_config;
///
/// let cfg = load_config("config/training.json").unwrap();
/// assert!(cfg.batch_size > 0);
/// ```
pub fn load_config(path: &str) -> Result<TrainingConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(message: &str) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

fn validate_config(config: &TrainingConfig) -> Result<(), Box<dyn Error>> {
    if config.batch_size == 0 {
        return Err(invalid("batch_size must be greater than 0"));
    }
    if config.eval_samples == 0 {
        return Err(invalid("eval_samples must be greater than 0"));
    }
    if !(config.learning_rate > 0.0) {
        return Err(invalid("learning_rate must be positive"));
    }
    Ok(())
}
