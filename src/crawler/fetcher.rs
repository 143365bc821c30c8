//! Provider fetch client
//!
//! This module handles every outbound call to the provider, including:
//! - Building the shared HTTP client (proxy, relaxed TLS, user agent)
//! - Resolving a job into its request URL and cache fingerprint
//! - Serving repeated requests from the response cache
//! - Coalescing concurrent requests for one fingerprint
//! - Attaching and retiring credentials
//! - The fixed pause after every network call

use crate::config::NetworkConfig;
use crate::crawler::catalog::IDENTITY_PLACEHOLDER;
use crate::crawler::credentials::{mask, CredentialPool};
use crate::crawler::job::CrawlJob;
use crate::storage::{Storage, StorageError};
use reqwest::{Client, Proxy, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while fetching a provider resource
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Provider answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("No credentials left in the pool")]
    NoCredentials,

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Response cache error: {0}")]
    Cache(#[from] StorageError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Builds the HTTP client shared by all workers
///
/// # Arguments
///
/// * `config` - The network configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client or parse the proxy
pub fn build_http_client(config: &NetworkConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Resolves a job into its key-less request URL
///
/// The identity replaces the path placeholder and fields are appended as
/// query pairs in key order, so the URL doubles as the cache fingerprint.
pub fn resolve_path(job: &CrawlJob) -> Result<Url, FetchError> {
    let identity = job.identity.as_deref().unwrap_or("");
    let raw = job.source.path.replace(IDENTITY_PLACEHOLDER, identity);
    let mut url = Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !job.fields.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &job.fields {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    )
}

/// Cache-aware, credentialed provider client
pub struct FetchClient {
    client: Client,
    credentials: CredentialPool,
    credential_param: String,
    request_delay: Duration,
    cache: Arc<dyn Storage>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FetchClient {
    pub fn new(
        client: Client,
        credentials: CredentialPool,
        credential_param: impl Into<String>,
        request_delay: Duration,
        cache: Arc<dyn Storage>,
    ) -> Self {
        Self {
            client,
            credentials,
            credential_param: credential_param.into(),
            request_delay,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn credentials(&self) -> &CredentialPool {
        &self.credentials
    }

    /// Fetches the raw body for a job
    ///
    /// A cached response is returned without touching the network. Otherwise
    /// one GET is issued with the next credential and a successful body is
    /// cached under the job fingerprint. Concurrent callers for the same
    /// fingerprint wait for the first call and read its cached body.
    pub async fn fetch(&self, job: &CrawlJob) -> Result<String, FetchError> {
        let url = resolve_path(job)?;
        let fingerprint = url.as_str().to_string();

        if let Some(body) = self.cache.get_finished_request(&fingerprint)? {
            tracing::trace!("Cache hit for {}", fingerprint);
            return Ok(body);
        }

        let slot = self.claim(&fingerprint);
        let result = {
            let _guard = slot.lock().await;
            match self.cache.get_finished_request(&fingerprint) {
                Ok(Some(body)) => {
                    tracing::trace!("Served {} from a concurrent fetch", fingerprint);
                    Ok(body)
                }
                Ok(None) => self.fetch_uncached(url, &fingerprint).await,
                Err(e) => Err(e.into()),
            }
        };
        self.release(&fingerprint, slot);
        result
    }

    async fn fetch_uncached(&self, url: Url, fingerprint: &str) -> Result<String, FetchError> {
        let key = self.credentials.draw().ok_or(FetchError::NoCredentials)?;
        let mut request_url = url;
        request_url
            .query_pairs_mut()
            .append_pair(&self.credential_param, &key);

        tracing::debug!("Fetching {} with credential {}", fingerprint, mask(&key));
        let result = self.send(request_url, fingerprint, &key).await;

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let body = result?;
        self.cache.create_finished_request(fingerprint, &body)?;
        Ok(body)
    }

    /// Returns the lock serializing calls for `fingerprint`
    fn claim(&self, fingerprint: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(fingerprint.to_string()).or_default())
    }

    /// Drops the fingerprint lock once no other caller holds it
    fn release(&self, fingerprint: &str, slot: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        drop(slot);
        if in_flight
            .get(fingerprint)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            in_flight.remove(fingerprint);
        }
    }

    async fn send(&self, url: Url, fingerprint: &str, key: &str) -> Result<String, FetchError> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(source) => {
                self.credentials.retire(key);
                return Err(FetchError::Transport {
                    url: fingerprint.to_string(),
                    source,
                });
            }
        };

        let status = response.status();
        if is_rejection(status) {
            tracing::warn!("Provider rejected credential {} with {}", mask(key), status);
            self.credentials.retire(key);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: fingerprint.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| {
            self.credentials.retire(key);
            FetchError::Transport {
                url: fingerprint.to_string(),
                source,
            }
        })
    }
}
