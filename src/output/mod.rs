//! Output module for reporting harvest results
//!
//! This module handles:
//! - Record statistics read back from storage
//! - Listing the jobs a request expands into (dry runs)

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::CrawlJob;

/// Renders one line per planned job
pub fn format_job_plan(jobs: &[CrawlJob]) -> String {
    let mut out = String::new();
    for (index, job) in jobs.iter().enumerate() {
        out.push_str(&format!("  {:>4}. {}\n", index + 1, job));
    }
    out
}
