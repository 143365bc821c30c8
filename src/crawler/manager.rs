//! Crawl manager - public entry point of the crawl engine
//!
//! The manager owns the worker pool. It validates inbound requests against
//! the catalog, expands them into concrete jobs and queues those jobs.

use crate::config::Config;
use crate::crawler::catalog::Catalog;
use crate::crawler::context::CrawlContext;
use crate::crawler::dispatcher::Dispatcher;
use crate::crawler::expander::expand_fields;
use crate::crawler::job::{CrawlJob, JobKind};
use crate::crawler::processor::JobProcessor;
use crate::crawler::worker::Worker;
use crate::request::CrawlRequest;
use crate::storage::Storage;
use crate::ValidationError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Validates and expands a request into the jobs it stands for
///
/// Paginated sources without an identity start with one page-count discovery job per
/// field combination. Every other source must name a job kind.
pub fn plan_jobs(catalog: &Catalog, request: &CrawlRequest) -> crate::Result<Vec<CrawlJob>> {
    let source = catalog
        .get(&request.source_name)
        .ok_or_else(|| ValidationError::UnknownSource(request.source_name.clone()))?;

    if let Some((key, _)) = request.fields.iter().find(|(key, _)| !source.allows(key)) {
        return Err(ValidationError::UnknownFieldKind {
            source_name: source.name.clone(),
            key: key.clone(),
        }
        .into());
    }

    let identity = request.id.clone().filter(|id| !id.trim().is_empty());
    let kind = if source.paginated && identity.is_none() {
        JobKind::PagesNum
    } else {
        JobKind::from_alias(&source.name)
            .ok_or_else(|| ValidationError::UnsupportedSource(source.name.clone()))?
    };

    let jobs = expand_fields(&request.fields)?
        .into_iter()
        .map(|fields| CrawlJob::new(kind, Arc::clone(&source), identity.clone(), fields))
        .collect();
    Ok(jobs)
}

/// Running crawl engine
pub struct Manager {
    ctx: Arc<CrawlContext>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl Manager {
    /// Builds the crawl context and starts the dispatcher and workers
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &Config, storage: Arc<dyn Storage>) -> crate::Result<Self> {
        let (ctx, inbound) = CrawlContext::new(config, storage)?;
        let ctx = Arc::new(ctx);
        let worker_count = ctx.settings.workers_number.max(1);

        let (available_tx, available_rx) = mpsc::channel(worker_count);
        let dispatcher =
            Dispatcher::new(inbound, available_rx, worker_count, ctx.queue.clone()).spawn();

        let workers = (0..worker_count)
            .map(|id| {
                let processor = JobProcessor::new(Arc::clone(&ctx));
                Worker::new(id, available_tx.clone(), processor).spawn()
            })
            .collect();

        tracing::info!(
            "Crawl engine started with {} workers, {} data sources",
            worker_count,
            ctx.catalog.len()
        );

        Ok(Self {
            ctx,
            dispatcher,
            workers,
        })
    }

    pub fn context(&self) -> &Arc<CrawlContext> {
        &self.ctx
    }

    /// Expands a request without queueing anything
    pub fn plan(&self, request: &CrawlRequest) -> crate::Result<Vec<CrawlJob>> {
        plan_jobs(&self.ctx.catalog, request)
    }

    /// Validates, expands and queues a request
    ///
    /// Returns the number of jobs queued. Nothing is queued when validation
    /// or expansion fails, or when the queue lacks room for every job.
    pub fn submit(&self, request: &CrawlRequest) -> crate::Result<usize> {
        let jobs = self.plan(request)?;
        let count = jobs.len();
        self.ctx.queue.enqueue_all(jobs)?;
        tracing::info!("Queued {} jobs for source {}", count, request.source_name);
        Ok(count)
    }

    /// Jobs accepted and not yet finished
    pub fn pending(&self) -> usize {
        self.ctx.queue.pending()
    }

    /// Resolves once every queued job and its follow-ups have finished
    pub async fn wait_idle(&self) {
        self.ctx.queue.wait_idle().await
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.dispatcher.abort();
        for worker in &self.workers {
            worker.abort();
        }
    }
}
