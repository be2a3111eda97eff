//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `app.env`.
pub const ENV_OVERRIDE: &str = "STRATA_ENV";

/// Error type for configuration loading and app assembly.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    /// A middleware name that resolves to nothing callable.
    #[error("middleware '{0}' is not registered")]
    NotCallable(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;

    apply_env_override(&mut config, std::env::var(ENV_OVERRIDE).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Replace `app.env` when an override is present and non-empty.
pub fn apply_env_override(config: &mut AppConfig, value: Option<String>) {
    if let Some(env) = value.filter(|v| !v.trim().is_empty()) {
        tracing::debug!(env = %env, "Environment overridden");
        config.app.env = env;
    }
}
