//! Tests for gradient-check configuration parsing
//!
//! This file tests the config module including:
//! - Loading the shipped JSON config files
//! - Defaults for optional fields
//! - Handling invalid JSON and unknown fields
//! - Handling missing files
//! - Rejecting non-positive dimensions and tolerances

use rust_recurrent_layers::config::{load_config, parse_config};
use rust_recurrent_layers::layers::CellType;
use rust_recurrent_layers::RecurrentError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp config");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

// ============================================================================
// Valid Config Loading Tests
// ============================================================================

mod valid_config_tests {
    use super::*;

    #[test]
    fn test_load_lstm_config() {
        let config =
            load_config("config/lstm_gradcheck.json").expect("Failed to load lstm config");

        assert_eq!(config.cell_type, CellType::Lstm);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.seq_len, 4);
        assert_eq!(config.input_dim, 5);
        assert_eq!(config.hidden_dim, 6);
        assert_eq!(config.vocab_size, 10);
        assert_eq!(config.weight_scale, 0.3);
        assert_eq!(config.tolerance, 1e-5);
    }

    #[test]
    fn test_load_rnn_config() {
        let config = load_config("config/rnn_gradcheck.json").expect("Failed to load rnn config");

        assert_eq!(config.cell_type, CellType::Rnn);
        assert_eq!(config.seed, 231);
        assert_eq!(config.tolerance, 1e-6);
    }

    #[test]
    fn test_load_from_temp_file() {
        let temp = write_temp_config(
            r#"{
  "cell_type": "rnn",
  "batch_size": 1,
  "seq_len": 1,
  "input_dim": 1,
  "hidden_dim": 1,
  "vocab_size": 1,
  "seed": 9
}"#,
        );
        let config = load_config(temp.path()).expect("Failed to load temp config");
        assert_eq!(config.seed, 9);
        assert_eq!(config.epsilon, 1e-5);
    }
}

// ============================================================================
// Invalid Config Tests
// ============================================================================

mod invalid_config_tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let result = load_config("config/does_not_exist.json");
        assert!(matches!(result, Err(RecurrentError::Io(_))));
    }

    #[test]
    fn test_malformed_json() {
        let temp = write_temp_config("{ \"cell_type\": \"lstm\", ");
        assert!(matches!(load_config(temp.path()), Err(RecurrentError::Json(_))));
    }

    #[test]
    fn test_unknown_cell_type() {
        let result = parse_config(
            r#"{"cell_type": "gru", "batch_size": 1, "seq_len": 1,
                "input_dim": 1, "hidden_dim": 1, "vocab_size": 1}"#,
        );
        assert!(matches!(result, Err(RecurrentError::Json(_))));
    }

    #[test]
    fn test_unknown_field() {
        let result = parse_config(
            r#"{"cell_type": "lstm", "batch_size": 1, "seq_len": 1,
                "input_dim": 1, "hidden_dim": 1, "vocab_size": 1,
                "learning_rate": 0.1}"#,
        );
        assert!(matches!(result, Err(RecurrentError::Json(_))));
    }

    #[test]
    fn test_missing_dimension() {
        let result = parse_config(r#"{"cell_type": "lstm", "batch_size": 1}"#);
        assert!(matches!(result, Err(RecurrentError::Json(_))));
    }

    #[test]
    fn test_zero_hidden_dim() {
        let result = parse_config(
            r#"{"cell_type": "lstm", "batch_size": 1, "seq_len": 1,
                "input_dim": 1, "hidden_dim": 0, "vocab_size": 1}"#,
        );
        match result {
            Err(RecurrentError::InvalidConfig(msg)) => assert!(msg.contains("hidden_dim")),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_tolerance() {
        let result = parse_config(
            r#"{"cell_type": "rnn", "batch_size": 1, "seq_len": 1,
                "input_dim": 1, "hidden_dim": 1, "vocab_size": 1,
                "tolerance": 0.0}"#,
        );
        assert!(matches!(result, Err(RecurrentError::InvalidConfig(_))));
    }
}
