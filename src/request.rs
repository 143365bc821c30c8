//! Inbound crawl requests
//!
//! A request names a data source, carries its field values in document order
//! and optionally targets one identity. Request files hold either a single
//! request object or an array of them.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading a request file
#[derive(Debug, Error)]
pub enum RequestFileError {
    #[error("Failed to read request file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed request document: {0}")]
    Json(#[from] serde_json::Error),
}

/// One logical crawl request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawlRequest {
    #[serde(rename = "sourceName")]
    pub source_name: String,

    /// Field values in the order the document lists them
    #[serde(default, deserialize_with = "ordered_fields")]
    pub fields: Vec<(String, String)>,

    #[serde(default)]
    pub id: Option<String>,
}

impl CrawlRequest {
    pub fn new(source_name: &str, fields: &[(&str, &str)], id: Option<&str>) -> Self {
        Self {
            source_name: source_name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            id: id.map(str::to_string),
        }
    }
}

fn ordered_fields<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FieldsVisitor;

    impl<'de> Visitor<'de> for FieldsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of field names to string values")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, Value>()? {
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(de::Error::custom(format!(
                            "field '{}' must be a string, got {}",
                            key, other
                        )))
                    }
                };
                fields.push((key, value));
            }
            Ok(fields)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(FieldsVisitor)
}

/// Parses a request document holding one request or an array of them
pub fn parse_requests(raw: &str) -> Result<Vec<CrawlRequest>, RequestFileError> {
    let document: Value = serde_json::from_str(raw)?;
    let requests = match document {
        Value::Array(_) => serde_json::from_value(document)?,
        _ => vec![serde_json::from_value(document)?],
    };
    Ok(requests)
}

/// Reads and parses a request file
pub fn load_requests(path: &Path) -> Result<Vec<CrawlRequest>, RequestFileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| RequestFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_requests(&raw)
}
