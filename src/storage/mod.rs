//! Storage module for persisting harvested records
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Article trees normalized into entity and relation tables
//! - The response cache that deduplicates provider calls

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// An article row as stored, without its relations
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub scopus_id: String,
    pub title: String,
    pub abstracts: String,
    pub publication_date: String,
    pub citations_count: i64,
    pub publication_type: String,
    pub publication_title: String,
    pub doi: String,
    pub resolved: bool,
    pub author_count: usize,
    pub keyword_count: usize,
    pub subject_area_count: usize,
}

/// Row counts per entity table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub articles: u64,
    pub resolved_articles: u64,
    pub authors: u64,
    pub affiliations: u64,
    pub keywords: u64,
    pub subject_areas: u64,
    pub citations: u64,
    pub cached_responses: u64,
}
