use crate::config::types::{CatalogConfig, Config, CrawlerConfig, HttpConfig, ProfileEntry};
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_catalog_config(&config.catalog)?;
    validate_profiles(&config.profiles)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.dequeue_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "dequeue-timeout-ms must be >= 1ms".to_string(),
        ));
    }

    if config.write_batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "write-batch-size must be >= 1, got {}",
            config.write_batch_size
        )));
    }

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates catalog configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.default_path.is_empty() {
        return Err(ConfigError::Validation(
            "default-path cannot be empty".to_string(),
        ));
    }

    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates named catalog profiles
fn validate_profiles(profiles: &[ProfileEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in profiles {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Profile name cannot be empty".to_string(),
            ));
        }

        if entry.name == "default" {
            return Err(ConfigError::Validation(
                "Profile name 'default' is reserved, set catalog.default-path instead".to_string(),
            ));
        }

        if entry.resource.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Profile '{}' must have a resource",
                entry.name
            )));
        }

        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Profile '{}' is defined more than once",
                entry.name
            )));
        }
    }

    Ok(())
}
