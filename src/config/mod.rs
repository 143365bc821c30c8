//! Configuration module for Scopus-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! including the data source catalog and the API key list.
//!
//! # Example
//!
//! ```no_run
//! use scopus_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Workers: {}", config.crawler.workers_number);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, CredentialsConfig, NetworkConfig, SourceEntry, StorageConfig,
};

// Re-export parser functions
pub use parser::{compute_catalog_hash, load_config, load_config_with_hash, read_keys_file};
