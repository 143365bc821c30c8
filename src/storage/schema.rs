//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Scopus-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    scopus_id TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    abstracts TEXT NOT NULL DEFAULT '',
    publication_date TEXT NOT NULL DEFAULT '',
    citations_count INTEGER NOT NULL DEFAULT 0,
    publication_type TEXT NOT NULL DEFAULT '',
    publication_title TEXT NOT NULL DEFAULT '',
    doi TEXT NOT NULL DEFAULT '',
    resolved INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS authors (
    scopus_id TEXT PRIMARY KEY,
    initials TEXT NOT NULL DEFAULT '',
    indexed_name TEXT NOT NULL DEFAULT '',
    surname TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS affiliations (
    scopus_id TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT '',
    postal_code TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS keywords (
    id TEXT PRIMARY KEY,
    keyword TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subject_areas (
    scopus_id TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    code TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT ''
);

-- Relations
CREATE TABLE IF NOT EXISTS article_author (
    article_id TEXT NOT NULL,
    author_id TEXT NOT NULL,
    author_affiliations TEXT NOT NULL DEFAULT '',
    UNIQUE(article_id, author_id)
);

CREATE TABLE IF NOT EXISTS article_article (
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    UNIQUE(from_id, to_id)
);

CREATE INDEX IF NOT EXISTS idx_article_article_from ON article_article(from_id);

CREATE TABLE IF NOT EXISTS article_area (
    article_id TEXT NOT NULL,
    area_id TEXT NOT NULL,
    UNIQUE(article_id, area_id)
);

CREATE TABLE IF NOT EXISTS article_keyword (
    article_id TEXT NOT NULL,
    keyword_id TEXT NOT NULL,
    UNIQUE(article_id, keyword_id)
);

-- Response cache keyed by the key-less request fingerprint
CREATE TABLE IF NOT EXISTS finished_requests (
    request TEXT PRIMARY KEY,
    response TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);

-- Run metadata, such as the catalog hash the cache was built under
CREATE TABLE IF NOT EXISTS harvest_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let tables = vec![
            "articles",
            "authors",
            "affiliations",
            "keywords",
            "subject_areas",
            "article_author",
            "article_article",
            "article_area",
            "article_keyword",
            "finished_requests",
            "harvest_meta",
        ];

        for table in tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
