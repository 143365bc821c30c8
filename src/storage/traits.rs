//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::records::{Affiliation, Article};
use crate::storage::{ArticleRecord, RecordCounts};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Article has no identity")]
    MissingIdentity,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Workers share one backend, so implementations must be safe to call from
/// any task concurrently.
pub trait Storage: Send + Sync {
    // ===== Records =====

    /// Persists an article tree in one call
    ///
    /// The article row and every sub-entity are upserted by identity, so
    /// writing the same article twice leaves one logical record. Resolved
    /// references are written in full; reference stubs only create a row
    /// when the referenced article is not stored yet.
    fn create_article(&self, article: &Article) -> StorageResult<()>;

    /// Upserts a single affiliation
    fn create_affiliation(&self, affiliation: &Affiliation) -> StorageResult<()>;

    /// Returns true if the affiliation is already stored
    fn check_affiliation(&self, scopus_id: &str) -> StorageResult<bool>;

    // ===== Response Cache =====

    /// Gets the raw response previously stored for a request fingerprint
    fn get_finished_request(&self, fingerprint: &str) -> StorageResult<Option<String>>;

    /// Stores the raw response for a fingerprint; later writes for the same
    /// fingerprint are ignored
    fn create_finished_request(&self, fingerprint: &str, body: &str) -> StorageResult<()>;

    /// Stores the catalog hash for this run and returns the one stored before
    fn record_catalog_hash(&self, hash: &str) -> StorageResult<Option<String>>;

    // ===== Reads =====

    /// Gets a stored article row
    fn get_article(&self, scopus_id: &str) -> StorageResult<Option<ArticleRecord>>;

    /// Gets a stored affiliation
    fn get_affiliation(&self, scopus_id: &str) -> StorageResult<Option<Affiliation>>;

    /// Gets the identities an article cites
    fn get_references(&self, scopus_id: &str) -> StorageResult<Vec<String>>;

    /// Counts rows per entity table
    fn count_records(&self) -> StorageResult<RecordCounts>;
}
