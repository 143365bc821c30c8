//! Crawl engine
//!
//! This module contains the core crawling logic, including:
//! - Request validation and expansion into concrete jobs
//! - The bounded job queue and the dispatcher feeding the worker pool
//! - Per-kind job processing with bounded reference recursion
//! - Cached, credentialed provider fetching

mod catalog;
mod context;
mod credentials;
mod dispatcher;
mod expander;
mod fetcher;
mod job;
mod manager;
mod processor;
mod queue;
mod worker;

#[cfg(test)]
mod testing;

pub use catalog::{Catalog, DataSource, IDENTITY_PLACEHOLDER};
pub use context::CrawlContext;
pub use credentials::{mask, CredentialPool};
pub use dispatcher::{Dispatcher, WorkerIntake};
pub use expander::{expand_fields, page_starts, FieldValueSet, QUERY_FIELD};
pub use fetcher::{build_http_client, resolve_path, FetchClient, FetchError};
pub use job::{CrawlJob, JobKind};
pub use manager::{plan_jobs, Manager};
pub use processor::JobProcessor;
pub use queue::{JobQueue, QueueError};
pub use worker::Worker;
