//! Pagewalk: a resumable paginated crawler
//!
//! This crate enumerates every combination of a two-level query domain,
//! walks each combination's result pages against a remote source, keeps only
//! records it has never stored before, and checkpoints progress after every
//! page so an interrupted run picks up where it left off.

pub mod config;
pub mod crawler;
pub mod domain;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Pagewalk operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// Everything in here is fatal: it is raised before any unit is dispatched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse domain description: {0}")]
    Domain(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern in config: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Pagewalk operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator};
pub use domain::{UnitKey, WorkUnit};
pub use output::RunSummary;
