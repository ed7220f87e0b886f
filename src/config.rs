use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::mapping::DEFAULT_MAX_JOIN_RESOLUTION_STEPS;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Translation pipeline configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Resolver calls allowed for one navigation before it is reported as cyclic
    #[validate(range(
        min = 1,
        max = 1024,
        message = "Max join resolution steps must be between 1 and 1024"
    ))]
    pub max_join_resolution_steps: usize,

    /// Log every prepared and resolved statement at debug level
    pub log_statements: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_join_resolution_steps: DEFAULT_MAX_JOIN_RESOLUTION_STEPS,
            log_statements: false,
        }
    }
}

impl TranslationConfig {
    /// Create configuration from environment variables (and `.env`) with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        // a missing .env file is fine
        let _ = dotenvy::dotenv();

        let config = Self {
            max_join_resolution_steps: parse_env_var(
                "RELMAP_MAX_JOIN_STEPS",
                &DEFAULT_MAX_JOIN_RESOLUTION_STEPS.to_string(),
            )?,
            log_statements: parse_env_var("RELMAP_LOG_STATEMENTS", "false")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply a command line override and re-validate
    pub fn with_max_join_resolution_steps(mut self, steps: usize) -> Result<Self, ConfigError> {
        self.max_join_resolution_steps = steps;
        self.validate()?;
        Ok(self)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
