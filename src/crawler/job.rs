//! Crawl jobs
//!
//! A job is created once and consumed once. Follow-up work is described by a
//! new job derived from an existing one.

use crate::crawler::catalog::DataSource;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// What a worker does with a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Asks a paginated search for its total result count
    PagesNum,
    /// Fetch one search result page
    Search,
    /// Resolve one article and its references
    Article,
    /// Fetch one affiliation record
    Affiliation,
}

impl JobKind {
    /// Maps a data source alias to a job kind
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "PagesNum" => Some(Self::PagesNum),
            "search" => Some(Self::Search),
            "article" => Some(Self::Article),
            "affiliation" => Some(Self::Affiliation),
            _ => None,
        }
    }

    pub fn alias(&self) -> &'static str {
        match self {
            Self::PagesNum => "PagesNum",
            Self::Search => "search",
            Self::Article => "article",
            Self::Affiliation => "affiliation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// One unit of crawl work
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    pub kind: JobKind,
    pub source: Arc<DataSource>,
    pub identity: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl CrawlJob {
    pub fn new(
        kind: JobKind,
        source: Arc<DataSource>,
        identity: Option<String>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind,
            source,
            identity,
            fields,
        }
    }

    /// Same request, different kind
    pub fn with_kind(&self, kind: JobKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Same request with one field added or replaced
    pub fn with_field(&self, key: &str, value: impl Into<String>) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(key.to_string(), value.into());
        Self {
            fields,
            ..self.clone()
        }
    }
}

impl fmt::Display for CrawlJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}", self.kind, self.source.name)?;
        if let Some(id) = &self.identity {
            write!(f, " id={}", id)?;
        }
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}
