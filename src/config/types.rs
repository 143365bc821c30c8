use serde::Deserialize;

/// Main configuration structure for Scopus-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    #[serde(rename = "workers-number")]
    pub workers_number: usize,

    /// How many levels of citation references are resolved below an article
    #[serde(rename = "references-depth", default)]
    pub references_depth: u32,

    /// Results the provider returns per search page
    #[serde(rename = "results-per-page", default = "default_results_per_page")]
    pub results_per_page: u32,

    /// Highest result offset the provider lets a search reach
    #[serde(rename = "max-result-offset", default = "default_max_result_offset")]
    pub max_result_offset: u32,

    /// Pause after every outbound call (seconds)
    #[serde(rename = "request-delay", default)]
    pub request_delay: u64,

    /// Capacity of the inbound job queue
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Static egress proxy for every provider call
    #[serde(default)]
    pub proxy: Option<String>,

    /// Skip TLS peer verification for the upstream
    #[serde(rename = "accept-invalid-certs", default = "default_true")]
    pub accept_invalid_certs: bool,

    /// Query parameter that carries the API key
    #[serde(rename = "credential-param", default = "default_credential_param")]
    pub credential_param: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            accept_invalid_certs: default_true(),
            credential_param: default_credential_param(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// API keys handed to the credential pool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    /// Keys listed inline
    #[serde(default)]
    pub keys: Vec<String>,

    /// File with one key per line
    #[serde(rename = "keys-file", default)]
    pub keys_file: Option<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Data source catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    /// Name requests and jobs refer to (e.g. "search", "article")
    pub name: String,

    /// Endpoint template; `{_id_}` is replaced by the job identity
    pub path: String,

    /// Field names a request may set
    #[serde(default)]
    pub keys: Vec<String>,

    /// Identity-less requests return paged search results
    #[serde(default)]
    pub paginated: bool,
}

fn default_results_per_page() -> u32 {
    25
}

fn default_max_result_offset() -> u32 {
    4975
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_credential_param() -> String {
    "apiKey".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("scopus-harvest/{}", env!("CARGO_PKG_VERSION"))
}
