//! Configuration management for the credit scoring service
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`CREDITAI__` prefix, `__` separator)
//!
//! Secrets (database password, chat API key) have no default value and
//! must come from the environment or a deployment-specific file.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, ChatConfig, DatabaseConfig, ObservabilityConfig, RuntimeEnvironment,
    ScoringConfig, ServerConfig, Settings, TableConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
