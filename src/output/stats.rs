//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! record statistics from the storage layer.

use crate::storage::{RecordCounts, Storage, StorageResult};

/// Harvest statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestStatistics {
    /// Row counts per table
    pub counts: RecordCounts,

    /// Articles only known from another article's bibliography
    pub unresolved_articles: u64,

    /// Average number of stored references per resolved article
    pub references_per_article: f64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<HarvestStatistics> {
    let counts = storage.count_records()?;
    let references_per_article = if counts.resolved_articles > 0 {
        counts.citations as f64 / counts.resolved_articles as f64
    } else {
        0.0
    };

    Ok(HarvestStatistics {
        counts,
        unresolved_articles: counts.articles.saturating_sub(counts.resolved_articles),
        references_per_article,
    })
}

/// Renders statistics as a plain text report
pub fn format_statistics(stats: &HarvestStatistics) -> String {
    let counts = &stats.counts;
    let resolved_share = if counts.articles > 0 {
        (counts.resolved_articles as f64 / counts.articles as f64) * 100.0
    } else {
        0.0
    };

    let mut out = String::from("=== Harvest Statistics ===\n\n");
    out.push_str("Articles:\n");
    out.push_str(&format!("  Total: {}\n", counts.articles));
    out.push_str(&format!(
        "  Resolved: {} ({:.1}%)\n",
        counts.resolved_articles, resolved_share
    ));
    out.push_str(&format!("  Reference stubs: {}\n", stats.unresolved_articles));
    out.push_str(&format!(
        "  Citations: {} ({:.1} per resolved article)\n\n",
        counts.citations, stats.references_per_article
    ));

    out.push_str("Related records:\n");
    out.push_str(&format!("  Authors: {}\n", counts.authors));
    out.push_str(&format!("  Affiliations: {}\n", counts.affiliations));
    out.push_str(&format!("  Keywords: {}\n", counts.keywords));
    out.push_str(&format!("  Subject areas: {}\n\n", counts.subject_areas));

    out.push_str(&format!("Cached responses: {}\n", counts.cached_responses));
    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    print!("{}", format_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Article;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_load_statistics() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let article = Article {
            scopus_id: "1".to_string(),
            resolved: true,
            references: vec![
                Article {
                    scopus_id: "2".to_string(),
                    ..Article::default()
                },
                Article {
                    scopus_id: "3".to_string(),
                    ..Article::default()
                },
            ],
            ..Article::default()
        };
        storage.create_article(&article).unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.counts.articles, 3);
        assert_eq!(stats.unresolved_articles, 2);
        assert_eq!(stats.references_per_article, 2.0);
    }

    #[test]
    fn test_format_empty_statistics() {
        let stats = HarvestStatistics {
            counts: RecordCounts::default(),
            unresolved_articles: 0,
            references_per_article: 0.0,
        };

        let report = format_statistics(&stats);
        assert!(report.contains("Total: 0"));
        assert!(report.contains("Resolved: 0 (0.0%)"));
    }
}
