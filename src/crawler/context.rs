//! Shared crawl context
//!
//! Built once per run and handed to the manager, the dispatcher and every
//! worker behind an `Arc`.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::catalog::Catalog;
use crate::crawler::credentials::CredentialPool;
use crate::crawler::fetcher::{build_http_client, FetchClient, FetchError};
use crate::crawler::job::CrawlJob;
use crate::crawler::queue::JobQueue;
use crate::storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything a job needs besides the job itself
pub struct CrawlContext {
    pub settings: CrawlerConfig,
    pub catalog: Catalog,
    pub storage: Arc<dyn Storage>,
    pub fetcher: FetchClient,
    pub queue: JobQueue,
}

impl CrawlContext {
    /// Builds the context and returns the receiving end of its job queue
    pub fn new(
        config: &Config,
        storage: Arc<dyn Storage>,
    ) -> crate::Result<(Self, mpsc::Receiver<CrawlJob>)> {
        let client = build_http_client(&config.network).map_err(FetchError::from)?;
        let credentials = CredentialPool::new(config.credentials.keys.iter().cloned());
        tracing::info!("Credential pool holds {} keys", credentials.len());

        let fetcher = FetchClient::new(
            client,
            credentials,
            config.network.credential_param.clone(),
            Duration::from_secs(config.crawler.request_delay),
            Arc::clone(&storage),
        );
        let (queue, receiver) = JobQueue::new(config.crawler.queue_capacity);

        let context = Self {
            settings: config.crawler.clone(),
            catalog: Catalog::from_entries(&config.sources),
            storage,
            fetcher,
            queue,
        };
        Ok((context, receiver))
    }
}
