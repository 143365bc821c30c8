//! Scopus-Harvest: a bounded citation crawler for bibliographic APIs
//!
//! This crate expands seed search requests into paged search jobs, resolves
//! every hit into a full article record, follows citation references up to a
//! configured depth and persists the normalized records.

pub mod config;
pub mod crawler;
pub mod output;
pub mod records;
pub mod request;
pub mod storage;

use thiserror::Error;

/// Main error type for Scopus-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Expansion error: {0}")]
    Expand(#[from] ExpandError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] records::ExtractionError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] crawler::QueueError),

    #[error("Request document error: {0}")]
    Request(#[from] request::RequestFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Rejections of an inbound crawl request, raised before any job is queued
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown data source: {0}")]
    UnknownSource(String),

    #[error("Field '{key}' is not allowed for data source '{source_name}'")]
    UnknownFieldKind { source_name: String, key: String },

    #[error("Data source '{0}' cannot be crawled directly")]
    UnsupportedSource(String),
}

/// Malformed range-valued fields
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("Range for field '{key}' starts after it finishes: {start} > {finish}")]
    InvalidRange { key: String, start: i64, finish: i64 },

    #[error("Range bound '{value}' for field '{key}' is not a number")]
    NotANumber { key: String, value: String },
}

/// Result type alias for Scopus-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlJob, JobKind, Manager};
pub use records::{Affiliation, Article, Author, Keyword, SubjectArea};
pub use request::CrawlRequest;
