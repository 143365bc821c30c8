//! Scopus-Harvest main entry point
//!
//! This is the command-line interface for the Scopus-Harvest citation crawler.

use anyhow::{bail, Context};
use clap::Parser;
use scopus_harvest::config::{load_config_with_hash, Config};
use scopus_harvest::crawler::{plan_jobs, Catalog, Manager};
use scopus_harvest::output::{format_job_plan, load_statistics, print_statistics};
use scopus_harvest::request::{load_requests, CrawlRequest};
use scopus_harvest::storage::{open_storage, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Scopus-Harvest: a bounded citation crawler
///
/// Scopus-Harvest expands search requests into result pages, resolves every
/// hit into a full article record, follows citation references to a fixed
/// depth and stores the normalized records in SQLite.
#[derive(Parser, Debug)]
#[command(name = "scopus-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded citation crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// JSON file with one crawl request or an array of them (repeatable)
    #[arg(short, long = "request", value_name = "FILE")]
    requests: Vec<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate requests and print the jobs they expand into without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show record statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, catalog_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (catalog hash: {})", catalog_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    let requests = read_requests(&cli.requests)?;
    if cli.dry_run {
        handle_dry_run(&config, &requests)
    } else {
        handle_crawl(&config, &catalog_hash, &requests).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scopus_harvest=info,warn"),
            1 => EnvFilter::new("scopus_harvest=debug,info"),
            2 => EnvFilter::new("scopus_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn read_requests(paths: &[PathBuf]) -> anyhow::Result<Vec<CrawlRequest>> {
    if paths.is_empty() {
        bail!("No request file given; pass one or more with --request");
    }

    let mut requests = Vec::new();
    for path in paths {
        let loaded = load_requests(path)?;
        tracing::info!("Loaded {} requests from {}", loaded.len(), path.display());
        requests.extend(loaded);
    }
    Ok(requests)
}

/// Handles the --dry-run mode: validates requests and lists their jobs
fn handle_dry_run(config: &Config, requests: &[CrawlRequest]) -> anyhow::Result<()> {
    println!("=== Scopus-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers_number);
    println!("  References depth: {}", config.crawler.references_depth);
    println!("  Results per page: {}", config.crawler.results_per_page);
    println!("  Request delay: {}s", config.crawler.request_delay);
    println!("  Credentials: {}", config.credentials.keys.len());
    println!("  Database: {}", config.storage.database_path);

    let catalog = Catalog::from_entries(&config.sources);
    println!("\nData Sources ({}):", config.sources.len());
    for source in &config.sources {
        println!("  - {} -> {}", source.name, source.path);
    }

    let mut total = 0;
    for request in requests {
        let jobs = plan_jobs(&catalog, request)
            .with_context(|| format!("Invalid request for source '{}'", request.source_name))?;
        println!("\nRequest '{}' expands into {} jobs:", request.source_name, jobs.len());
        print!("{}", format_job_plan(&jobs));
        total += jobs.len();
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would queue {} initial jobs", total);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    catalog_hash: &str,
    requests: &[CrawlRequest],
) -> anyhow::Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(
        open_storage(Path::new(&config.storage.database_path))
            .context("Failed to open the harvest database")?,
    );

    match storage.record_catalog_hash(catalog_hash)? {
        Some(previous) if previous != catalog_hash => tracing::warn!(
            "Response cache was built under a different source catalog ({}); cached bodies may not match the current endpoints",
            previous
        ),
        _ => {}
    }
    let manager = Manager::new(config, Arc::clone(&storage))?;

    let start_time = std::time::Instant::now();
    for request in requests {
        manager
            .submit(request)
            .with_context(|| format!("Rejected request for source '{}'", request.source_name))?;
    }

    manager.wait_idle().await;

    let counts = storage.count_records()?;
    tracing::info!(
        "Harvest completed in {:?}: {} articles ({} resolved), {} affiliations",
        start_time.elapsed(),
        counts.articles,
        counts.resolved_articles,
        counts.affiliations
    );

    Ok(())
}
