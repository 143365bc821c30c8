//! Data source catalog
//!
//! The catalog is built once from the `[[source]]` tables of the config file
//! and shared read-only by the manager and every worker.

use crate::config::SourceEntry;
use std::collections::HashMap;
use std::sync::Arc;

/// Placeholder in a source path that is replaced by the job identity
pub const IDENTITY_PLACEHOLDER: &str = "{_id_}";

/// A named provider endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub name: String,
    pub path: String,
    pub keys: Vec<String>,
    pub paginated: bool,
}

impl DataSource {
    /// Returns true if requests may set the given field
    pub fn allows(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

impl From<&SourceEntry> for DataSource {
    fn from(entry: &SourceEntry) -> Self {
        Self {
            name: entry.name.clone(),
            path: entry.path.clone(),
            keys: entry.keys.clone(),
            paginated: entry.paginated,
        }
    }
}

/// Immutable lookup of data sources by name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sources: HashMap<String, Arc<DataSource>>,
}

impl Catalog {
    pub fn from_entries(entries: &[SourceEntry]) -> Self {
        let sources = entries
            .iter()
            .map(|entry| (entry.name.clone(), Arc::new(DataSource::from(entry))))
            .collect();
        Self { sources }
    }

    pub fn get(&self, name: &str) -> Option<Arc<DataSource>> {
        self.sources.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
