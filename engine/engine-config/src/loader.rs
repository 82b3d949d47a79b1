//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",      // Current directory
    "../config.toml",   // Parent directory (when running from subdirectory)
    "/app/config.toml", // Docker container
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by T3_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
/// 4. Docker container path (/app/config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var("T3_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from T3_CONFIG: {}", path.display());
            return load_from_path(&path);
        }
        warn!("T3_CONFIG={} not found, searching defaults", path.display());
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (usize, u32, f64, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = v;
        }
    };
    // Optional parseable field (Option<u64>)
    ($config:expr, $section:ident . $field:ident, $key:expr, optional_parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = Some(v);
        }
    };
    // Comma separated list ("18,32,9"); ignored unless every item parses
    ($config:expr, $section:ident . $field:ident, $key:expr, list) => {
        if let Ok(v) = std::env::var($key) {
            let parsed: Result<Vec<_>, _> = v.split(',').map(|s| s.trim().parse()).collect();
            match parsed {
                Ok(list) => $config.$section.$field = list,
                Err(_) => warn!("Ignoring malformed {}={}", $key, v),
            }
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: T3_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.data_dir, "T3_COMMON_DATA_DIR");
    env_override!(config, common.log_level, "T3_COMMON_LOG_LEVEL");

    // Generator
    env_override!(config, generator.count, "T3_GENERATOR_COUNT", parse);
    env_override!(
        config,
        generator.break_threshold,
        "T3_GENERATOR_BREAK_THRESHOLD",
        parse
    );
    env_override!(
        config,
        generator.threshold_decay,
        "T3_GENERATOR_THRESHOLD_DECAY",
        parse
    );
    env_override!(
        config,
        generator.max_retries,
        "T3_GENERATOR_MAX_RETRIES",
        parse
    );
    env_override!(
        config,
        generator.max_duplicates,
        "T3_GENERATOR_MAX_DUPLICATES",
        parse
    );
    env_override!(config, generator.seed, "T3_GENERATOR_SEED", optional_parse);

    // Training
    env_override!(
        config,
        training.learning_rate,
        "T3_TRAINING_LEARNING_RATE",
        parse
    );
    env_override!(
        config,
        training.cost_threshold,
        "T3_TRAINING_COST_THRESHOLD",
        parse
    );
    env_override!(config, training.epochs, "T3_TRAINING_EPOCHS", parse);
    env_override!(config, training.batch_size, "T3_TRAINING_BATCH_SIZE", parse);
    env_override!(config, training.layers, "T3_TRAINING_LAYERS", list);
    env_override!(config, training.examples_dir, "T3_TRAINING_EXAMPLES_DIR");
    env_override!(config, training.weights_file, "T3_TRAINING_WEIGHTS_FILE");
    env_override!(config, training.seed, "T3_TRAINING_SEED", optional_parse);

    // Evaluation
    env_override!(config, evaluation.games, "T3_EVALUATION_GAMES", parse);
    env_override!(config, evaluation.seed, "T3_EVALUATION_SEED", optional_parse);

    config
}
