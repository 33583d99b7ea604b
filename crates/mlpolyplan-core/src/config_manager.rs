use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::document::RecipeStyle;
use crate::heuristic::SplitPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for mlpolyplan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlanConfig {
    /// Split heuristic thresholds
    #[serde(default)]
    pub policy: SplitPolicy,

    /// Target names and recipe details
    #[serde(default)]
    pub recipes: RecipeStyle,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
} // stdout carries the makefile; keep stderr quiet

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: PlanConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables
    /// 2. Config file (`explicit`, else ./.mlpolyplan.toml, else ~/.mlpolyplan/config.toml)
    /// 3. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// Same as [`ConfigManager::load`], reading overrides through `lookup`
    /// instead of the process environment.
    pub fn load_with<F>(explicit: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (config, config_path) = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                (Self::read_toml_file(path)?, Some(path.to_path_buf()))
            }
            None => Self::load_config_file()?,
        };

        let config = Self::apply_env_overrides(config, lookup);
        Self::validate_config(&config)?;

        match &config_path {
            Some(path) => info!("Config file: {}", path.display()),
            None => debug!("No config file found, using defaults"),
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Wraps an already built configuration after validating it.
    pub fn from_config(config: PlanConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    fn load_config_file() -> Result<(PlanConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".mlpolyplan.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".mlpolyplan").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((PlanConfig::default(), None))
    }

    /// Read TOML config file
    pub fn read_toml_file(path: &Path) -> Result<PlanConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides read through `lookup`
    pub fn apply_env_overrides<F>(mut config: PlanConfig, lookup: F) -> PlanConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(var) = lookup("MLPOLYPLAN_GENERATOR_VAR") {
            config.recipes.generator_var = var;
        }
        if let Some(include) = lookup("MLPOLYPLAN_INCLUDE") {
            config.recipes.include_file = include;
        }
        if let Some(dir) = lookup("MLPOLYPLAN_FILES_DIR") {
            config.recipes.files_dir = dir;
        }
        if let Some(atomic) = lookup("MLPOLYPLAN_ATOMIC_WRITES") {
            config.recipes.atomic_writes = atomic.to_lowercase() == "true" || atomic == "1";
        }

        if let Some(level) = lookup("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    /// Validate configuration
    pub fn validate_config(config: &PlanConfig) -> Result<(), ConfigError> {
        let recipes = &config.recipes;
        for (field, value) in [
            ("recipes.generator_var", &recipes.generator_var),
            ("recipes.include_file", &recipes.include_file),
            ("recipes.files_dir", &recipes.files_dir),
        ] {
            if value.trim().is_empty() || value.chars().any(char::is_whitespace) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be a non-empty name without whitespace, got {:?}",
                    field, value
                )));
            }
        }

        let policy = &config.policy;
        if policy.default_incr_per_level == 0 {
            return Err(ConfigError::ValidationError(
                "policy.default_incr_per_level must be at least 1".to_string(),
            ));
        }
        if policy.level_span == 0 {
            return Err(ConfigError::ValidationError(
                "policy.level_span must be at least 1".to_string(),
            ));
        }
        if policy.no_split_max_order > policy.shallow_split_max_order {
            return Err(ConfigError::ValidationError(format!(
                "policy.no_split_max_order ({}) exceeds policy.shallow_split_max_order ({})",
                policy.no_split_max_order, policy.shallow_split_max_order
            )));
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Default configuration rendered as TOML
    pub fn default_toml() -> Result<String, ConfigError> {
        toml::to_string_pretty(&PlanConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
