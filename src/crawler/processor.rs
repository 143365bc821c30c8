//! Per-kind job behavior
//!
//! Page discovery and search fan out into new jobs. Article jobs resolve
//! their references in place, depth-first, before the assembled tree is
//! persisted. Affiliations are enriched by jobs of their own.

use crate::crawler::catalog::DataSource;
use crate::crawler::context::CrawlContext;
use crate::crawler::expander::page_starts;
use crate::crawler::job::{CrawlJob, JobKind};
use crate::records::{extract, Article, ExtractionError};
use crate::{HarvestError, ValidationError};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = crate::Result<Article>> + Send + 'a>>;

/// Executes crawl jobs against a shared context
#[derive(Clone)]
pub struct JobProcessor {
    ctx: Arc<CrawlContext>,
}

impl JobProcessor {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<CrawlContext> {
        &self.ctx
    }

    /// Runs one job to completion, queueing any follow-up jobs
    pub async fn process(&self, job: CrawlJob) -> crate::Result<()> {
        tracing::debug!("Processing {}", job);
        match job.kind {
            JobKind::PagesNum => self.discover_pages(&job).await,
            JobKind::Search => self.search(&job).await,
            JobKind::Article => self.resolve_article(&job).await,
            JobKind::Affiliation => self.enrich_affiliation(&job).await,
        }
    }

    async fn discover_pages(&self, job: &CrawlJob) -> crate::Result<()> {
        let body = self.ctx.fetcher.fetch(job).await?;
        let total = extract::total_results(&body)?;
        let starts = page_starts(
            total,
            self.ctx.settings.results_per_page,
            self.ctx.settings.max_result_offset,
        );
        tracing::info!(
            "Search via {} reports {} results, queueing {} pages",
            job.source.name,
            total,
            starts.len()
        );

        for start in starts {
            let page = job.with_kind(JobKind::Search).with_field("start", start.to_string());
            self.ctx.queue.enqueue(page)?;
        }
        Ok(())
    }

    async fn search(&self, job: &CrawlJob) -> crate::Result<()> {
        let body = self.ctx.fetcher.fetch(job).await?;
        let ids = extract::search_identities(&body)?;
        let source = self.source(JobKind::Article)?;

        tracing::debug!("Search page yielded {} articles", ids.len());
        for id in ids {
            let article = CrawlJob::new(
                JobKind::Article,
                Arc::clone(&source),
                Some(id),
                BTreeMap::new(),
            );
            self.ctx.queue.enqueue(article)?;
        }
        Ok(())
    }

    async fn resolve_article(&self, job: &CrawlJob) -> crate::Result<()> {
        let id = identity(job)?;
        let mut ancestors = Vec::new();
        let article = self
            .fetch_article(&job.source, id, 0, &mut ancestors)
            .await?;

        self.queue_affiliations(&article)?;
        self.ctx.storage.create_article(&article)?;
        tracing::info!(
            "Stored article {} with {} references",
            article.scopus_id,
            article.references.len()
        );
        Ok(())
    }

    /// Fetches an article and resolves its references below `depth`
    ///
    /// References already on the ancestor path, and those without an
    /// identity, stay stubs. A reference that cannot be fetched stays a stub.
    fn fetch_article<'a>(
        &'a self,
        source: &'a Arc<DataSource>,
        id: &'a str,
        depth: u32,
        ancestors: &'a mut Vec<String>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let job = CrawlJob::new(
                JobKind::Article,
                Arc::clone(source),
                Some(id.to_string()),
                BTreeMap::new(),
            );
            let body = self.ctx.fetcher.fetch(&job).await?;
            let mut article = extract::article(&body, id)?;

            if depth >= self.ctx.settings.references_depth {
                return Ok(article);
            }

            ancestors.push(article.scopus_id.clone());
            for reference in article.references.iter_mut() {
                let reference_id = reference.scopus_id.clone();
                if reference_id.is_empty() || ancestors.contains(&reference_id) {
                    continue;
                }
                match self
                    .fetch_article(source, &reference_id, depth + 1, ancestors)
                    .await
                {
                    Ok(resolved) => *reference = resolved,
                    Err(e) => {
                        tracing::warn!("Keeping reference {} unresolved: {}", reference_id, e)
                    }
                }
            }
            ancestors.pop();

            Ok(article)
        })
    }

    fn queue_affiliations(&self, article: &Article) -> crate::Result<()> {
        let Some(source) = self.ctx.catalog.get(JobKind::Affiliation.alias()) else {
            tracing::debug!("No affiliation source configured");
            return Ok(());
        };

        for id in article.linked_affiliation_ids() {
            if self.ctx.storage.check_affiliation(&id)? {
                continue;
            }
            let job = CrawlJob::new(
                JobKind::Affiliation,
                Arc::clone(&source),
                Some(id.clone()),
                BTreeMap::new(),
            );
            if let Err(e) = self.ctx.queue.enqueue(job) {
                tracing::warn!("Dropping affiliation {}: {}", id, e);
            }
        }
        Ok(())
    }

    async fn enrich_affiliation(&self, job: &CrawlJob) -> crate::Result<()> {
        let id = identity(job)?;
        let body = self.ctx.fetcher.fetch(job).await?;
        let affiliation = extract::affiliation(&body, id)?;
        self.ctx.storage.create_affiliation(&affiliation)?;
        tracing::debug!("Stored affiliation {}", id);
        Ok(())
    }

    fn source(&self, kind: JobKind) -> crate::Result<Arc<DataSource>> {
        self.ctx
            .catalog
            .get(kind.alias())
            .ok_or_else(|| ValidationError::UnknownSource(kind.alias().to_string()).into())
    }
}

fn identity(job: &CrawlJob) -> Result<&str, HarvestError> {
    job.identity
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ExtractionError::MissingIdentity.into())
}
