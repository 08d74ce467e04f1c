//! Configuration Loader
//!
//! Environment-aware configuration loading. Values start from the validated
//! defaults, then merge an optional `leavecore.toml`, an optional
//! `leavecore.<environment>.toml`, and finally `LEAVECORE_`-prefixed
//! environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::LeavecoreConfig;
use crate::error::{LeavecoreError, Result};

/// Loads and holds the merged configuration for one process
pub struct ConfigManager {
    config: LeavecoreConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection.
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory.
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load with an explicit environment. Useful for tests that must not
    /// mutate process-global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        let dir = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = environment,
            directory = %dir.display(),
            "loading configuration"
        );

        let defaults = serde_json::to_string(&LeavecoreConfig::default())
            .map_err(|e| LeavecoreError::ConfigurationError(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults,
            config::FileFormat::Json,
        ));

        for candidate in [
            dir.join("leavecore.toml"),
            dir.join(format!("leavecore.{environment}.toml")),
        ] {
            if Path::new(&candidate).exists() {
                builder = builder.add_source(config::File::from(candidate));
            }
        }

        let merged = builder
            .add_source(config::Environment::with_prefix("LEAVECORE").separator("__"))
            .build()
            .map_err(|e| LeavecoreError::ConfigurationError(e.to_string()))?;

        let config: LeavecoreConfig = merged
            .try_deserialize()
            .map_err(|e| LeavecoreError::ConfigurationError(e.to_string()))?;

        config.validate()?;

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
        }))
    }

    /// The merged configuration.
    pub fn config(&self) -> &LeavecoreConfig {
        &self.config
    }

    /// The environment this configuration was loaded for.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn detect_environment() -> String {
        std::env::var("LEAVECORE_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_without_files() {
        let manager =
            ConfigManager::load_from_directory_with_env(Some(PathBuf::from("/nonexistent")), "test")
                .unwrap();
        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().calendar_sync.max_attempts, 5);
    }
}
