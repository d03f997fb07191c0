//! Configuration for gradient-check runs
//!
//! Describes the cell type and the (N, T, D, H, V) dimensions of a randomly
//! initialised problem, plus the finite-difference step and the tolerance the
//! analytic gradients are held to.

use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{RecurrentError, Result};
use crate::layers::CellType;

/// Gradient-check configuration parsed from JSON.
///
/// Dimensions are required; the remaining fields fall back to defaults.
///
/// # Example
///
/// ```json
/// {
///   "cell_type": "lstm",
///   "batch_size": 3,
///   "seq_len": 4,
///   "input_dim": 5,
///   "hidden_dim": 6,
///   "vocab_size": 10,
///   "weight_scale": 0.3
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradCheckConfig {
    /// "rnn" or "lstm"
    pub cell_type: CellType,

    /// N
    pub batch_size: usize,

    /// T
    pub seq_len: usize,

    /// D, also the word-vector width
    pub input_dim: usize,

    /// H
    pub hidden_dim: usize,

    /// V
    pub vocab_size: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Scale of the random parameters.
    #[serde(default = "default_weight_scale")]
    pub weight_scale: f64,

    /// Finite-difference step h.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Largest relative error accepted between analytic and numerical gradients.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_seed() -> u64 {
    231
}

fn default_weight_scale() -> f64 {
    0.1
}

fn default_epsilon() -> f64 {
    1e-5
}

fn default_tolerance() -> f64 {
    1e-5
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        Self {
            cell_type: CellType::Lstm,
            batch_size: 2,
            seq_len: 3,
            input_dim: 4,
            hidden_dim: 5,
            vocab_size: 7,
            seed: default_seed(),
            weight_scale: default_weight_scale(),
            epsilon: default_epsilon(),
            tolerance: default_tolerance(),
        }
    }
}

/// Loads a gradient-check configuration from a JSON file.
///
/// # Returns
///
/// `Ok(GradCheckConfig)` on success, or an error if the file cannot be read,
/// the JSON is invalid, or a value fails validation.
///
/// # Examples
///
/// ```no_run
/// use rust_recurrent_layers::config::load_config;
///
/// let cfg = load_config("config/lstm_gradcheck.json").unwrap();
/// assert_eq!(cfg.hidden_dim, 6);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<GradCheckConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config = parse_config(&contents)?;
    debug!("loaded config from {}: {:?}", path.as_ref().display(), config);
    Ok(config)
}

/// Parse and validate a configuration from a JSON string.
pub fn parse_config(json: &str) -> Result<GradCheckConfig> {
    let config: GradCheckConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &GradCheckConfig) -> Result<()> {
    let dims = [
        ("batch_size", config.batch_size),
        ("seq_len", config.seq_len),
        ("input_dim", config.input_dim),
        ("hidden_dim", config.hidden_dim),
        ("vocab_size", config.vocab_size),
    ];
    for (name, value) in dims {
        if value == 0 {
            return Err(RecurrentError::InvalidConfig(format!(
                "{} must be positive",
                name
            )));
        }
    }

    let scalars = [
        ("weight_scale", config.weight_scale),
        ("epsilon", config.epsilon),
        ("tolerance", config.tolerance),
    ];
    for (name, value) in scalars {
        if !(value.is_finite() && value > 0.0) {
            return Err(RecurrentError::InvalidConfig(format!(
                "{} must be a positive finite number, got {}",
                name, value
            )));
        }
    }

    Ok(())
}
