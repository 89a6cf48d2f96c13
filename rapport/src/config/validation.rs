//! Configuration validation utilities.

use super::ConfigError;
use super::models::*;

/// Validate the entire configuration.
pub fn validate_config(config: &RapportConfig) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_allocator_config(&config.allocator)?;

    if let Some(file) = &config.logging.file
        && file.as_os_str().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "Log file path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Data directory cannot be empty".to_string(),
        ));
    }

    if config.backend == StorageBackend::SurrealDB {
        config
            .surrealdb
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    }

    Ok(())
}

fn validate_allocator_config(config: &AllocatorConfig) -> Result<(), ConfigError> {
    if config.max_duration.is_zero() {
        return Err(ConfigError::ValidationError(
            "allocator.max_duration must be greater than 0".to_string(),
        ));
    }
    if config.default_duration.is_zero() || config.default_duration > config.max_duration {
        return Err(ConfigError::ValidationError(format!(
            "allocator.default_duration must be between 0 and {:?}",
            config.max_duration
        )));
    }
    if config.lock_stripes == 0 {
        return Err(ConfigError::ValidationError(
            "allocator.lock_stripes must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
