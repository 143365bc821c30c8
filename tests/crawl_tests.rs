//! Integration tests for the crawl engine
//!
//! These tests use wiremock to stand in for the provider API and run whole
//! harvests end-to-end against a temporary database.

use scopus_harvest::config::{compute_catalog_hash, load_config, Config};
use scopus_harvest::crawler::Manager;
use scopus_harvest::storage::{open_storage, Storage};
use scopus_harvest::{CrawlRequest, HarvestError, ValidationError};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a config file and a keys file into `dir` and loads them
fn write_config(dir: &Path, base_url: &str, workers: usize, depth: u32, keys: &[&str]) -> Config {
    std::fs::write(dir.join("keys.txt"), format!("# provider keys\n{}\n", keys.join("\n")))
        .unwrap();

    let raw = format!(
        r#"
[crawler]
workers-number = {workers}
references-depth = {depth}
results-per-page = 20
request-delay = 0

[credentials]
keys-file = "keys.txt"

[storage]
database-path = "{db}"

[[source]]
name = "search"
path = "{base}/content/search/scopus"
keys = ["query"]
paginated = true

[[source]]
name = "article"
path = "{base}/content/abstract/scopus_id/{{_id_}}"

[[source]]
name = "affiliation"
path = "{base}/content/affiliation/affiliation_id/{{_id_}}"
"#,
        workers = workers,
        depth = depth,
        db = dir.join("harvest.db").display(),
        base = base_url,
    );
    let config_path = dir.join("harvest.toml");
    std::fs::write(&config_path, raw).unwrap();
    load_config(&config_path).expect("test config should be valid")
}

fn article_body(id: &str, references: &[&str], affiliation: &str) -> String {
    let references: Vec<Value> = references
        .iter()
        .map(|r| json!({ "ref-info": { "refd-itemidlist": { "itemid": { "$": r, "@idtype": "SGR" } } } }))
        .collect();
    json!({
        "abstracts-retrieval-response": {
            "coredata": { "dc:identifier": format!("SCOPUS_ID:{}", id), "dc:title": format!("Article {}", id) },
            "affiliation": { "@id": affiliation, "affilname": "Crawl University" },
            "authors": { "author": { "@auid": "7000000001", "ce:surname": "Smith", "affiliation": { "@id": affiliation } } },
            "item": { "bibrecord": { "tail": { "bibliography": { "reference": references } } } }
        }
    })
    .to_string()
}

async fn mount_ok(server: &MockServer, at: &str, body: String, calls: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(calls)
        .mount(server)
        .await;
}

async fn run(manager: &Manager, requests: &[CrawlRequest]) {
    for request in requests {
        manager.submit(request).unwrap();
    }
    tokio::time::timeout(Duration::from_secs(10), manager.wait_idle())
        .await
        .expect("harvest should go idle");
}

async fn mount_pipeline(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/content/search/scopus"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            json!({ "search-results": {
                "opensearch:totalResults": "20",
                "entry": [ { "dc:identifier": "SCOPUS_ID:11" }, { "dc:identifier": "SCOPUS_ID:12" } ]
            } })
            .to_string(),
        ))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/search/scopus"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            json!({ "search-results": { "opensearch:totalResults": "20" } }).to_string(),
        ))
        .mount(server)
        .await;

    mount_ok(server, "/content/abstract/scopus_id/11", article_body("11", &["12", "99"], "600"), 1).await;
    mount_ok(server, "/content/abstract/scopus_id/12", article_body("12", &[], "600"), 1).await;
    mount_ok(server, "/content/abstract/scopus_id/99", article_body("99", &[], "601"), 1).await;
    mount_ok(
        server,
        "/content/affiliation/affiliation_id/600",
        json!({ "affiliation-retrieval-response": { "affiliation-name": "Crawl University", "city": "Leiden" } }).to_string(),
        1,
    )
    .await;
    mount_ok(
        server,
        "/content/affiliation/affiliation_id/601",
        json!({ "affiliation-retrieval-response": { "affiliation-name": "Fetch Institute" } }).to_string(),
        1,
    )
    .await;
}

#[tokio::test]
async fn test_full_harvest_from_search() {
    let server = MockServer::start().await;
    mount_pipeline(&server).await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri(), 1, 1, &["key-one"]);
    let storage: Arc<dyn Storage> =
        Arc::new(open_storage(Path::new(&config.storage.database_path)).unwrap());
    let manager = Manager::new(&config, Arc::clone(&storage)).unwrap();

    run(&manager, &[CrawlRequest::new("search", &[("query", "AF-ID(600)")], None)]).await;

    let counts = storage.count_records().unwrap();
    assert_eq!(counts.articles, 3);
    assert_eq!(counts.resolved_articles, 3);
    assert_eq!(counts.authors, 1);
    assert_eq!(counts.affiliations, 2);
    assert_eq!(storage.get_references("11").unwrap(), vec!["12", "99"]);

    let affiliation = storage.get_affiliation("600").unwrap().unwrap();
    assert_eq!(affiliation.title, "Crawl University");
    assert_eq!(affiliation.city, "Leiden");
    assert_eq!(manager.pending(), 0);
}

#[tokio::test]
async fn test_second_harvest_served_from_cache() {
    let server = MockServer::start().await;
    mount_pipeline(&server).await;

    let dir = TempDir::new().unwrap();
    let request = CrawlRequest::new("search", &[("query", "AF-ID(600)")], None);

    let config = write_config(dir.path(), &server.uri(), 1, 1, &["key-one"]);
    {
        let storage: Arc<dyn Storage> =
            Arc::new(open_storage(Path::new(&config.storage.database_path)).unwrap());
        let manager = Manager::new(&config, storage).unwrap();
        run(&manager, std::slice::from_ref(&request)).await;
    }

    // Cached responses never draw a key
    let config = write_config(dir.path(), &server.uri(), 1, 1, &["unused-key"]);
    let storage: Arc<dyn Storage> =
        Arc::new(open_storage(Path::new(&config.storage.database_path)).unwrap());
    let manager = Manager::new(&config, Arc::clone(&storage)).unwrap();
    run(&manager, &[request]).await;

    assert_eq!(manager.context().fetcher.credentials().len(), 1);
    assert_eq!(storage.count_records().unwrap().articles, 3);
}

#[tokio::test]
async fn test_rejected_key_is_retired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("apiKey", "revoked-key"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/abstract/scopus_id/2"))
        .and(query_param("apiKey", "valid-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_body("2", &[], "")))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri(), 1, 0, &["revoked-key", "valid-key"]);
    let storage: Arc<dyn Storage> =
        Arc::new(open_storage(Path::new(&config.storage.database_path)).unwrap());
    let manager = Manager::new(&config, Arc::clone(&storage)).unwrap();

    run(&manager, &[CrawlRequest::new("article", &[], Some("1"))]).await;
    run(&manager, &[CrawlRequest::new("article", &[], Some("2"))]).await;

    assert_eq!(manager.context().fetcher.credentials().len(), 1);
    assert!(storage.get_article("1").unwrap().is_none());
    assert!(storage.get_article("2").unwrap().unwrap().resolved);
}

#[tokio::test]
async fn test_invalid_request_queues_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri(), 2, 0, &["key-one"]);
    let storage: Arc<dyn Storage> =
        Arc::new(open_storage(Path::new(&config.storage.database_path)).unwrap());
    let manager = Manager::new(&config, storage).unwrap();

    let result = manager.submit(&CrawlRequest::new("search", &[("subj", "COMP")], None));

    assert!(matches!(
        result,
        Err(HarvestError::Validation(ValidationError::UnknownFieldKind { .. }))
    ));
    assert_eq!(manager.pending(), 0);
}

#[test]
fn test_catalog_change_detected_across_runs() {
    let dir = TempDir::new().unwrap();
    let first = write_config(dir.path(), "http://127.0.0.1:9", 1, 0, &["key-one"]);
    let hash = compute_catalog_hash(&first);
    {
        let storage = open_storage(Path::new(&first.storage.database_path)).unwrap();
        assert_eq!(storage.record_catalog_hash(&hash).unwrap(), None);
    }

    let moved = write_config(dir.path(), "http://127.0.0.1:10", 1, 0, &["key-one"]);
    let moved_hash = compute_catalog_hash(&moved);
    assert_ne!(moved_hash, hash);

    let storage = open_storage(Path::new(&moved.storage.database_path)).unwrap();
    assert_eq!(storage.record_catalog_hash(&moved_hash).unwrap(), Some(hash));
}
