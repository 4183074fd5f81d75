//! Weight persistence
//!
//! Trainable parameters are saved as one tagged record per layer, in
//! architecture order, serialized to JSON. Layers without parameters store a
//! `NotTrainable` marker so the record list always lines up with the layer
//! list when loading.

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

/// Default file name for saved weights.
pub const DEFAULT_WEIGHTS_PATH: &str = "weights.json";

/// Snapshot of one layer's parameters.
///
/// The format carries no version field: a checkpoint is only meaningful for
/// the exact architecture that wrote it. Shape mismatches surface as array
/// errors when the entries are assigned back into layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerState {
    /// The layer owns no parameters.
    NotTrainable,
    /// Weights and bias, shape-matched to the owning layer.
    Parameters {
        weights: ArrayD<f64>,
        bias: ArrayD<f64>,
    },
}

/// Writes layer states to `path` as a JSON array.
///
/// # Examples
///
/// ```no_run
/// use micronet::checkpoint::{save_states, LayerState};
///
/// save_states(&[LayerState::NotTrainable], "weights.json").unwrap();
/// ```
pub fn save_states(states: &[LayerState], path: &str) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, states)?;
    writer.flush()?;
    log::debug!("saved {} layer states to {}", states.len(), path);
    Ok(())
}

/// Reads layer states back from `path`.
pub fn load_states(path: &str) -> Result<Vec<LayerState>, Box<dyn Error>> {
    let file = File::open(path)?;
    let states: Vec<LayerState> = serde_json::from_reader(BufReader::new(file))?;
    log::debug!("loaded {} layer states from {}", states.len(), path);
    Ok(states)
}
