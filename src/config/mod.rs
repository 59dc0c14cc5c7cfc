//! Configuration module for Pagewalk
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pagewalk::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pagewalk.toml")).unwrap();
//! println!("Crawling with {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ColumnConfig, ColumnKind, Config, CrawlerConfig, OutputConfig, ParserConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_file, load_config, load_config_with_hash};
