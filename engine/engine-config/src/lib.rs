//! Centralized configuration loading from config.toml.
//!
//! This crate provides configuration structs and loading logic shared
//! across the t3 components (self-play generator, trainer, evaluator).
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`T3_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! T3_<SECTION>_<KEY>=value
//!
//! Examples:
//!     T3_COMMON_DATA_DIR=/data
//!     T3_GENERATOR_COUNT=5000
//!     T3_TRAINING_LEARNING_RATE=0.01
//!     T3_TRAINING_LAYERS=18,64,9
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{apply_env_overrides, load_config, load_from_path, CONFIG_SEARCH_PATHS};
pub use structs::*;

#[cfg(test)]
mod tests;
