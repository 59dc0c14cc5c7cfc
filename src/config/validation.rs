use crate::config::types::{Config, CrawlerConfig, OutputConfig, ParserConfig, SourceConfig};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_source_config(&config.source)?;
    validate_parser_config(&config.parser)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates pacing and bounds
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.max_pages_per_unit < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_unit must be >= 1, got {}",
            config.max_pages_per_unit
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    Ok(())
}

/// Validates the remote source
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.params.contains_key(&config.page_param) {
        return Err(ConfigError::Validation(format!(
            "params must not set the page parameter '{}'",
            config.page_param
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates selectors, the total pattern and the column layout
fn validate_parser_config(config: &ParserConfig) -> Result<(), ConfigError> {
    validate_selector(&config.row_selector)?;
    if let Some(selector) = &config.total_selector {
        validate_selector(selector)?;
    }

    let pattern = Regex::new(&config.total_pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!("total_pattern '{}': {}", config.total_pattern, e))
    })?;
    if pattern.captures_len() < 2 {
        return Err(ConfigError::InvalidPattern(format!(
            "total_pattern '{}' must contain a capture group",
            config.total_pattern
        )));
    }

    if let Some(base) = &config.link_base {
        validate_http_url("link_base", base)?;
    }

    if config.columns.is_empty() {
        return Err(ConfigError::Validation(
            "at least one parser column is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for column in &config.columns {
        if column.name.is_empty() {
            return Err(ConfigError::Validation(
                "column name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(column.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate column name '{}'",
                column.name
            )));
        }
    }

    if !seen.contains(config.key_field.as_str()) {
        return Err(ConfigError::Validation(format!(
            "key_field '{}' does not name a column",
            config.key_field
        )));
    }

    Ok(())
}

/// Validates output paths
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("domain_path", &config.domain_path),
        ("progress_path", &config.progress_path),
        ("records_path", &config.records_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.progress_path == config.records_path {
        return Err(ConfigError::Validation(
            "progress_path and records_path must differ".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("selector '{}': {:?}", selector, e)))
}
