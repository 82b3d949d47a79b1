//! Tests for the configuration module.

use super::*;
use std::io::Write;

#[test]
fn test_default_config() {
    let config = CentralConfig::default();
    assert_eq!(config.common.data_dir, "./data");
    assert_eq!(config.common.log_level, "info");
    assert_eq!(config.generator.count, 10_000);
    assert!(config.generator.seed.is_none());
    assert_eq!(config.evaluation.games, 100);
}

#[test]
fn test_training_defaults() {
    let config = CentralConfig::default();
    assert!((config.training.learning_rate - 0.001).abs() < f64::EPSILON);
    assert!((config.training.cost_threshold - 0.1).abs() < f64::EPSILON);
    assert_eq!(config.training.epochs, 10_000);
    assert_eq!(config.training.batch_size, 10);
    assert_eq!(config.training.layers, vec![18, 32, 32, 32, 9]);
    assert_eq!(config.training.examples_dir, "./data/examples");
    assert_eq!(config.training.weights_file, "./data/weights.json");
}

#[test]
fn test_t3_env_overrides() {
    std::env::set_var("T3_GENERATOR_COUNT", "7");
    std::env::set_var("T3_TRAINING_LAYERS", "18, 64, 9");
    std::env::set_var("T3_TRAINING_SEED", "42");

    let config = apply_env_overrides(CentralConfig::default());
    assert_eq!(config.generator.count, 7);
    assert_eq!(config.training.layers, vec![18, 64, 9]);
    assert_eq!(config.training.seed, Some(42));

    std::env::remove_var("T3_GENERATOR_COUNT");
    std::env::remove_var("T3_TRAINING_LAYERS");
    std::env::remove_var("T3_TRAINING_SEED");
}

#[test]
fn test_malformed_env_override_is_ignored() {
    std::env::set_var("T3_EVALUATION_GAMES", "many");
    std::env::set_var("T3_TRAINING_BATCH_SIZE", "");

    let config = apply_env_overrides(CentralConfig::default());
    assert_eq!(config.evaluation.games, 100);
    assert_eq!(config.training.batch_size, 10);

    std::env::remove_var("T3_EVALUATION_GAMES");
    std::env::remove_var("T3_TRAINING_BATCH_SIZE");
}

#[test]
fn test_parse_config_toml() {
    let toml_content = r#"
[common]
data_dir = "/custom/data"

[generator]
count = 250
seed = 9

[training]
epochs = 50
batch_size = 128
layers = [18, 9]
"#;
    let config: CentralConfig = toml::from_str(toml_content).unwrap();
    assert_eq!(config.common.data_dir, "/custom/data");
    assert_eq!(config.generator.count, 250);
    assert_eq!(config.generator.seed, Some(9));
    assert_eq!(config.training.epochs, 50);
    assert_eq!(config.training.batch_size, 128);
    assert_eq!(config.training.layers, vec![18, 9]);
}

#[test]
fn test_partial_config() {
    let toml_content = r#"
[training]
learning_rate = 0.05
"#;
    let config: CentralConfig = toml::from_str(toml_content).unwrap();
    assert!((config.training.learning_rate - 0.05).abs() < f64::EPSILON);
    assert_eq!(config.training.batch_size, 10); // Default
    assert_eq!(config.common.data_dir, "./data"); // Default
    assert_eq!(config.generator.max_retries, 100); // Default
}

#[test]
fn test_load_from_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[evaluation]\ngames = 12").unwrap();

    let config = load_from_path(&path);
    assert_eq!(config.evaluation.games, 12);
}

#[test]
fn test_load_from_path_falls_back_on_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is [not toml").unwrap();

    let config = load_from_path(&path);
    assert_eq!(config.training.epochs, 10_000);
}

#[test]
fn test_load_from_missing_path_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_from_path(&dir.path().join("absent.toml"));
    assert_eq!(config.common.log_level, "info");
}

#[test]
fn test_config_clone() {
    let config = CentralConfig::default();
    let cloned = config.clone();
    assert_eq!(config.common.data_dir, cloned.common.data_dir);
    assert_eq!(config.training.layers, cloned.training.layers);
}
