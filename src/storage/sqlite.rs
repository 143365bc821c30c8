//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! All workers share one connection; access is serialized by a mutex.

use crate::records::{Affiliation, Article, Author};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ArticleRecord, RecordCounts};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

/// Writes an article row, its sub-entities and its references
///
/// Only a failure of the article row itself is returned; sub-entity and
/// relation failures are logged and skipped.
fn write_article_tree(conn: &Connection, article: &Article) -> StorageResult<()> {
    if article.scopus_id.is_empty() {
        return Err(StorageError::MissingIdentity);
    }

    let now = Utc::now().to_rfc3339();
    let statement = if article.resolved {
        "INSERT OR REPLACE INTO articles VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)"
    } else {
        "INSERT OR IGNORE INTO articles VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)"
    };
    conn.execute(
        statement,
        params![
            article.scopus_id,
            article.title,
            article.abstracts,
            article.publication_date,
            article.citations_count,
            article.publication_type,
            article.publication_title,
            article.doi,
            now
        ],
    )?;

    if article.resolved {
        write_sub_entities(conn, article);
    }

    for reference in &article.references {
        if reference.scopus_id.is_empty() {
            continue;
        }
        if let Err(e) = write_article_tree(conn, reference) {
            tracing::warn!(
                "Unable to store reference {} of {}: {}",
                reference.scopus_id,
                article.scopus_id,
                e
            );
            continue;
        }
        if let Err(e) = conn.execute(
            "INSERT OR IGNORE INTO article_article (from_id, to_id) VALUES (?1, ?2)",
            params![article.scopus_id, reference.scopus_id],
        ) {
            tracing::warn!(
                "Unable to link article {} with reference {}: {}",
                article.scopus_id,
                reference.scopus_id,
                e
            );
        }
    }

    Ok(())
}

fn write_sub_entities(conn: &Connection, article: &Article) {
    let id = &article.scopus_id;

    for affiliation in &article.affiliations {
        if affiliation.scopus_id.is_empty() {
            continue;
        }
        if let Err(e) = upsert_affiliation(conn, affiliation) {
            tracing::warn!("Unable to add affiliation {}: {}", affiliation.scopus_id, e);
        }
    }

    for author in &article.authors {
        if author.scopus_id.is_empty() {
            continue;
        }
        let result = upsert_author(conn, author).and_then(|_| {
            conn.execute(
                "INSERT OR REPLACE INTO article_author (article_id, author_id, author_affiliations)
                 VALUES (?1, ?2, ?3)",
                params![id, author.scopus_id, author.affiliation_ids.join(",")],
            )
        });
        if let Err(e) = result {
            tracing::warn!("Unable to connect article {} with author {}: {}", id, author.scopus_id, e);
        }
    }

    for keyword in &article.keywords {
        let result = conn
            .execute(
                "INSERT OR REPLACE INTO keywords (id, keyword) VALUES (?1, ?2)",
                params![keyword.id, keyword.value],
            )
            .and_then(|_| {
                conn.execute(
                    "INSERT OR IGNORE INTO article_keyword (article_id, keyword_id) VALUES (?1, ?2)",
                    params![id, keyword.id],
                )
            });
        if let Err(e) = result {
            tracing::warn!("Unable to connect article {} with keyword {}: {}", id, keyword.id, e);
        }
    }

    for area in &article.subject_areas {
        let result = conn
            .execute(
                "INSERT OR REPLACE INTO subject_areas (scopus_id, title, code, description)
                 VALUES (?1, ?2, ?3, ?4)",
                params![area.scopus_id, area.title, area.code, area.description],
            )
            .and_then(|_| {
                conn.execute(
                    "INSERT OR IGNORE INTO article_area (article_id, area_id) VALUES (?1, ?2)",
                    params![id, area.scopus_id],
                )
            });
        if let Err(e) = result {
            tracing::warn!("Unable to connect article {} with area {}: {}", id, area.scopus_id, e);
        }
    }
}

/// Merges an affiliation into the stored row, keeping known values that the
/// incoming record leaves empty
fn upsert_affiliation(conn: &Connection, affiliation: &Affiliation) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO affiliations (scopus_id, title, country, city, state, postal_code, address)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(scopus_id) DO UPDATE SET
            title = COALESCE(NULLIF(excluded.title, ''), title),
            country = COALESCE(NULLIF(excluded.country, ''), country),
            city = COALESCE(NULLIF(excluded.city, ''), city),
            state = COALESCE(NULLIF(excluded.state, ''), state),
            postal_code = COALESCE(NULLIF(excluded.postal_code, ''), postal_code),
            address = COALESCE(NULLIF(excluded.address, ''), address)",
        params![
            affiliation.scopus_id,
            affiliation.title,
            affiliation.country,
            affiliation.city,
            affiliation.state,
            affiliation.postal_code,
            affiliation.address
        ],
    )
}

fn upsert_author(conn: &Connection, author: &Author) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO authors (scopus_id, initials, indexed_name, surname, name)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(scopus_id) DO UPDATE SET
            initials = COALESCE(NULLIF(excluded.initials, ''), initials),
            indexed_name = COALESCE(NULLIF(excluded.indexed_name, ''), indexed_name),
            surname = COALESCE(NULLIF(excluded.surname, ''), surname),
            name = COALESCE(NULLIF(excluded.name, ''), name)",
        params![
            author.scopus_id,
            author.initials,
            author.indexed_name,
            author.surname,
            author.name
        ],
    )
}

impl Storage for SqliteStorage {
    // ===== Records =====

    fn create_article(&self, article: &Article) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        write_article_tree(&tx, article)?;
        tx.commit()?;
        Ok(())
    }

    fn create_affiliation(&self, affiliation: &Affiliation) -> StorageResult<()> {
        if affiliation.scopus_id.is_empty() {
            return Err(StorageError::MissingIdentity);
        }
        let conn = self.lock()?;
        upsert_affiliation(&conn, affiliation)?;
        Ok(())
    }

    fn check_affiliation(&self, scopus_id: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM affiliations WHERE scopus_id = ?1 LIMIT 1",
                params![scopus_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ===== Response Cache =====

    fn get_finished_request(&self, fingerprint: &str) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        let body = conn
            .query_row(
                "SELECT response FROM finished_requests WHERE request = ?1",
                params![fingerprint],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn create_finished_request(&self, fingerprint: &str, body: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO finished_requests (request, response, fetched_at)
             VALUES (?1, ?2, ?3)",
            params![fingerprint, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn record_catalog_hash(&self, hash: &str) -> StorageResult<Option<String>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let previous = tx
            .query_row(
                "SELECT value FROM harvest_meta WHERE key = 'catalog_hash'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        tx.execute(
            "INSERT INTO harvest_meta (key, value) VALUES ('catalog_hash', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![hash],
        )?;
        tx.commit()?;
        Ok(previous)
    }

    // ===== Reads =====

    fn get_article(&self, scopus_id: &str) -> StorageResult<Option<ArticleRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT scopus_id, title, abstracts, publication_date, citations_count,
                    publication_type, publication_title, doi, resolved,
                    (SELECT COUNT(*) FROM article_author WHERE article_id = a.scopus_id),
                    (SELECT COUNT(*) FROM article_keyword WHERE article_id = a.scopus_id),
                    (SELECT COUNT(*) FROM article_area WHERE article_id = a.scopus_id)
             FROM articles a WHERE scopus_id = ?1",
        )?;

        let article = stmt
            .query_row(params![scopus_id], |row| {
                Ok(ArticleRecord {
                    scopus_id: row.get(0)?,
                    title: row.get(1)?,
                    abstracts: row.get(2)?,
                    publication_date: row.get(3)?,
                    citations_count: row.get(4)?,
                    publication_type: row.get(5)?,
                    publication_title: row.get(6)?,
                    doi: row.get(7)?,
                    resolved: row.get::<_, i64>(8)? != 0,
                    author_count: row.get::<_, i64>(9)? as usize,
                    keyword_count: row.get::<_, i64>(10)? as usize,
                    subject_area_count: row.get::<_, i64>(11)? as usize,
                })
            })
            .optional()?;

        Ok(article)
    }

    fn get_affiliation(&self, scopus_id: &str) -> StorageResult<Option<Affiliation>> {
        let conn = self.lock()?;
        let affiliation = conn
            .query_row(
                "SELECT scopus_id, title, country, city, state, postal_code, address
                 FROM affiliations WHERE scopus_id = ?1",
                params![scopus_id],
                |row| {
                    Ok(Affiliation {
                        scopus_id: row.get(0)?,
                        title: row.get(1)?,
                        country: row.get(2)?,
                        city: row.get(3)?,
                        state: row.get(4)?,
                        postal_code: row.get(5)?,
                        address: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(affiliation)
    }

    fn get_references(&self, scopus_id: &str) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT to_id FROM article_article WHERE from_id = ?1 ORDER BY rowid")?;
        let references = stmt
            .query_map(params![scopus_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(references)
    }

    fn count_records(&self) -> StorageResult<RecordCounts> {
        let conn = self.lock()?;
        let count = |sql: &str| -> StorageResult<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        Ok(RecordCounts {
            articles: count("SELECT COUNT(*) FROM articles")?,
            resolved_articles: count("SELECT COUNT(*) FROM articles WHERE resolved = 1")?,
            authors: count("SELECT COUNT(*) FROM authors")?,
            affiliations: count("SELECT COUNT(*) FROM affiliations")?,
            keywords: count("SELECT COUNT(*) FROM keywords")?,
            subject_areas: count("SELECT COUNT(*) FROM subject_areas")?,
            citations: count("SELECT COUNT(*) FROM article_article")?,
            cached_responses: count("SELECT COUNT(*) FROM finished_requests")?,
        })
    }
}
