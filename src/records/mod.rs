//! Bibliographic records produced by the extractor
//!
//! An [`Article`] owns its sub-entities by value; references are nested
//! articles forming a tree of bounded depth. Storage normalizes the tree into
//! relations keyed by each record's natural identity.

pub mod extract;

pub use extract::ExtractionError;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A publication, either fully fetched or a reference stub
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Article {
    pub scopus_id: String,
    pub title: String,
    pub abstracts: String,
    pub publication_date: String,
    pub citations_count: i64,
    pub publication_type: String,
    pub publication_title: String,
    pub doi: String,
    pub affiliations: Vec<Affiliation>,
    pub authors: Vec<Author>,
    pub keywords: Vec<Keyword>,
    pub subject_areas: Vec<SubjectArea>,
    pub references: Vec<Article>,

    /// True when the record came from a full retrieval rather than the
    /// bibliography entry of another article
    pub resolved: bool,
}

impl Article {
    /// Affiliation identities linked anywhere in this article's tree
    ///
    /// Covers the article's own affiliations, its authors' affiliations and
    /// those of every nested reference. Order of first appearance, no
    /// duplicates, empty identities skipped.
    pub fn linked_affiliation_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.collect_affiliation_ids(&mut ids);
        ids
    }

    fn collect_affiliation_ids(&self, ids: &mut Vec<String>) {
        let own = self.affiliations.iter().map(|a| &a.scopus_id);
        let by_author = self.authors.iter().flat_map(|a| a.affiliation_ids.iter());
        for id in own.chain(by_author) {
            if !id.is_empty() && !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        for reference in &self.references {
            reference.collect_affiliation_ids(ids);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    pub scopus_id: String,
    pub initials: String,
    pub indexed_name: String,
    pub surname: String,
    pub name: String,
    pub affiliation_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Affiliation {
    pub scopus_id: String,
    pub title: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub id: String,
    pub value: String,
}

impl Keyword {
    pub fn new(value: &str) -> Self {
        Self {
            id: content_id(&[value]),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubjectArea {
    pub scopus_id: String,
    pub title: String,
    pub code: String,
    pub description: String,
}

impl SubjectArea {
    pub fn new(title: &str, code: &str, description: &str) -> Self {
        Self {
            scopus_id: content_id(&[code, description, title]),
            title: title.to_string(),
            code: code.to_string(),
            description: description.to_string(),
        }
    }
}

/// Stable identity for records the provider does not number
///
/// First eight bytes of the SHA-256 digest, hex encoded.
pub fn content_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(&hasher.finalize()[..8])
}
