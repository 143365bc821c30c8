use crate::config::types::{Config, CrawlerConfig, NetworkConfig, SourceEntry};
use crate::crawler::IDENTITY_PLACEHOLDER;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_network_config(&config.network)?;
    validate_credentials(&config.credentials.keys)?;
    validate_storage_config(&config.storage)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers_number < 1 || config.workers_number > 256 {
        return Err(ConfigError::Validation(format!(
            "workers_number must be between 1 and 256, got {}",
            config.workers_number
        )));
    }

    if config.results_per_page < 1 {
        return Err(ConfigError::Validation(
            "results_per_page must be >= 1".to_string(),
        ));
    }

    if config.max_result_offset < config.results_per_page {
        return Err(ConfigError::Validation(format!(
            "max_result_offset ({}) must be >= results_per_page ({})",
            config.max_result_offset, config.results_per_page
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "queue_capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates outbound network configuration
fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if config.credential_param.is_empty() {
        return Err(ConfigError::Validation(
            "credential_param cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_credentials(keys: &[String]) -> Result<(), ConfigError> {
    if keys.iter().all(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "at least one API key is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_storage_config(config: &crate::config::types::StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the data source catalog
fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[source]] entry is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for entry in sources {
        if entry.name.is_empty() {
            return Err(ConfigError::Validation(
                "source name cannot be empty".to_string(),
            ));
        }

        if !names.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name '{}'",
                entry.name
            )));
        }

        validate_source_path(entry)?;
    }

    Ok(())
}

/// A source path must hold at most one identity placeholder and parse as a URL
fn validate_source_path(entry: &SourceEntry) -> Result<(), ConfigError> {
    let placeholders = entry.path.matches(IDENTITY_PLACEHOLDER).count();
    if placeholders > 1 {
        return Err(ConfigError::Validation(format!(
            "source '{}' path contains {} identity placeholders, expected at most one",
            entry.name, placeholders
        )));
    }

    let sample = entry.path.replace(IDENTITY_PLACEHOLDER, "0");
    Url::parse(&sample).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid path for source '{}': {}", entry.name, e))
    })?;

    Ok(())
}
