//! Layered configuration for subdig.
//!
//! Sources, lowest to highest priority: built-in defaults, `config.toml` in
//! the platform configuration directory, an explicit file (TOML, YAML or
//! JSON, chosen by extension), then `SUBDIG_*` environment variables.

mod config;
pub mod error;

pub use crate::config::{
    CacheConfig, Config, DEFAULT_EXTENSIONS, ENV_PREFIX, PipelineConfig, ToolsConfig, default_bundled_dirs,
    default_cache_path, default_config_path,
};
