//! Fixtures shared by the crawler unit tests

use crate::config::Config;
use serde_json::{json, Value};

/// A config whose sources all point at `base`
pub fn config(base: &str, references_depth: u32, queue_capacity: usize) -> Config {
    let raw = format!(
        r#"
[crawler]
workers-number = 2
references-depth = {depth}
results-per-page = 20
request-delay = 0
queue-capacity = {capacity}

[credentials]
keys = ["test-key"]

[storage]
database-path = ":memory:"

[[source]]
name = "search"
path = "{base}/content/search/scopus"
keys = ["query", "date"]
paginated = true

[[source]]
name = "article"
path = "{base}/content/abstract/scopus_id/{{_id_}}"

[[source]]
name = "affiliation"
path = "{base}/content/affiliation/affiliation_id/{{_id_}}"

[[source]]
name = "author"
path = "{base}/content/author/author_id/{{_id_}}"
"#,
        depth = references_depth,
        capacity = queue_capacity,
        base = base,
    );
    toml::from_str(&raw).unwrap()
}

pub fn search_body(total: u64, ids: &[&str]) -> String {
    let entries: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "dc:identifier": format!("SCOPUS_ID:{}", id) }))
        .collect();
    json!({
        "search-results": {
            "opensearch:totalResults": total.to_string(),
            "entry": entries
        }
    })
    .to_string()
}

pub fn article_body(id: &str, references: &[&str], affiliation: &str) -> String {
    let references: Vec<Value> = references
        .iter()
        .map(|reference| {
            json!({
                "ref-info": {
                    "ref-sourcetitle": "Journal of Crawling",
                    "refd-itemidlist": { "itemid": { "$": reference, "@idtype": "SGR" } }
                }
            })
        })
        .collect();

    json!({
        "abstracts-retrieval-response": {
            "coredata": {
                "dc:identifier": format!("SCOPUS_ID:{}", id),
                "dc:title": format!("Article {}", id),
                "citedby-count": "1"
            },
            "affiliation": { "@id": affiliation, "affilname": "Crawl University" },
            "item": { "bibrecord": { "tail": { "bibliography": { "reference": references } } } }
        }
    })
    .to_string()
}

pub fn affiliation_body(name: &str) -> String {
    json!({
        "affiliation-retrieval-response": {
            "affiliation-name": name,
            "city": "Leiden",
            "country": "Netherlands"
        }
    })
    .to_string()
}
