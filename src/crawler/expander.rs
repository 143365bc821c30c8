//! Request expansion
//!
//! Turns the set- and range-valued fields of a logical request into the
//! cartesian product of concrete field maps, and computes the page offsets
//! of a paginated search.

use crate::ExpandError;
use std::collections::BTreeMap;

/// Field whose value is always a comma-separated set, never a range
pub const QUERY_FIELD: &str = "query";

/// The values one request field stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValueSet {
    Explicit(Vec<String>),
    Range { start: i64, finish: i64 },
}

impl FieldValueSet {
    /// Parses a raw field value
    ///
    /// Comma-separated values and the `query` field become explicit sets.
    /// A value with exactly one `-` is an inclusive numeric range. Anything
    /// else is taken verbatim as a single value.
    pub fn parse(key: &str, raw: &str) -> Result<Self, ExpandError> {
        if key == QUERY_FIELD || raw.contains(',') {
            return Ok(Self::Explicit(raw.split(',').map(str::to_string).collect()));
        }

        let parts: Vec<&str> = raw.split('-').collect();
        if parts.len() != 2 {
            return Ok(Self::Explicit(vec![raw.to_string()]));
        }

        let bound = |value: &str| {
            value.trim().parse::<i64>().map_err(|_| ExpandError::NotANumber {
                key: key.to_string(),
                value: value.to_string(),
            })
        };
        let start = bound(parts[0])?;
        let finish = bound(parts[1])?;
        if start > finish {
            return Err(ExpandError::InvalidRange {
                key: key.to_string(),
                start,
                finish,
            });
        }

        Ok(Self::Range { start, finish })
    }

    pub fn values(&self) -> Vec<String> {
        match self {
            Self::Explicit(values) => values.clone(),
            Self::Range { start, finish } => (*start..=*finish).map(|v| v.to_string()).collect(),
        }
    }
}

/// Expands request fields into every concrete combination
///
/// Fields keep request order; earlier fields vary slowest. No fields yield a
/// single empty combination.
pub fn expand_fields(
    fields: &[(String, String)],
) -> Result<Vec<BTreeMap<String, String>>, ExpandError> {
    let mut combinations = vec![BTreeMap::new()];

    for (key, raw) in fields {
        let values = FieldValueSet::parse(key, raw)?.values();
        let mut next = Vec::with_capacity(combinations.len() * values.len());
        for combination in &combinations {
            for value in &values {
                let mut expanded = combination.clone();
                expanded.insert(key.clone(), value.clone());
                next.push(expanded);
            }
        }
        combinations = next;
    }

    Ok(combinations)
}

/// Result offsets of every page to request
///
/// The count is `total / results_per_page` full pages, capped at the deepest
/// offset the provider serves.
pub fn page_starts(total: u64, results_per_page: u32, max_result_offset: u32) -> Vec<u64> {
    if results_per_page == 0 {
        return Vec::new();
    }
    let per_page = u64::from(results_per_page);
    let pages = (total / per_page).min(u64::from(max_result_offset) / per_page);

    (0..pages).map(|page| page * per_page).collect()
}
