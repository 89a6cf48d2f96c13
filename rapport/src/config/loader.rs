//! Configuration loader.
//!
//! This module provides functionality to load configuration from multiple sources.

use super::{ConfigError, DEFAULT_CONFIG_FILES, ENV_PREFIX, Result, models::*, validation};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
};
use std::path::{Path, PathBuf};

/// Configuration loader that handles loading from multiple sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    figment: Figment,
}

impl ConfigLoader {
    /// Create a new configuration loader with default values.
    pub fn new() -> Self {
        let figment = Figment::new().merge(Serialized::defaults(RapportConfig::default()));
        Self { figment }
    }

    /// Start from an existing configuration instead of the defaults.
    pub fn from_config(config: &RapportConfig) -> Self {
        Self {
            figment: Figment::new().merge(Serialized::defaults(config)),
        }
    }

    /// Load configuration from a file.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileLoadError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(self.merge(Toml::file(path))),
            Some("yaml") | Some("yml") => Ok(self.merge(Yaml::file(path))),
            Some("json") => Ok(self.merge(Json::file(path))),
            _ => Err(ConfigError::FileLoadError(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }

    /// Attempt to load from default configuration file locations.
    pub fn load_default_files(&mut self) -> &mut Self {
        let local = DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists());

        let path = local.or_else(|| {
            let dirs = directories::ProjectDirs::from("org", "rapport", "rapport")?;
            ["toml", "yaml", "yml", "json"]
                .iter()
                .map(|ext| dirs.config_dir().join(format!("config.{}", ext)))
                .find(|path| path.exists())
        });

        if let Some(path) = path {
            tracing::debug!("Loading configuration from {}", path.display());
            if let Err(e) = self.load_file(&path) {
                tracing::warn!("Skipping configuration file: {}", e);
            }
        }

        self
    }

    /// Load configuration from environment variables.
    pub fn load_env(&mut self) -> &mut Self {
        let figment =
            std::mem::take(&mut self.figment).merge(Env::prefixed(ENV_PREFIX).split("__"));
        self.figment = figment;
        self
    }

    /// Load configuration from a custom source.
    pub fn merge<T: figment::Provider>(&mut self, provider: T) -> &mut Self {
        let figment = std::mem::take(&mut self.figment).merge(provider);
        self.figment = figment;
        self
    }

    /// Extract and validate the configuration.
    pub fn extract(&self) -> Result<RapportConfig> {
        let config: RapportConfig = self
            .figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        validation::validate_config(&config)?;

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
