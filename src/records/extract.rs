//! Record extraction from provider JSON responses
//!
//! The provider serializes one-element lists as bare objects and numbers as
//! strings in places, so every lookup here tolerates both shapes.

use crate::records::{Affiliation, Article, Author, Keyword, SubjectArea};
use serde_json::Value;
use thiserror::Error;

const SCOPUS_ID_PREFIX: &str = "SCOPUS_ID:";

/// Errors raised when a response lacks the data a job needs
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response has no '{0}' container")]
    MissingContainer(&'static str),

    #[error("Article response carries no identifier")]
    MissingIdentity,

    #[error("Unparseable total result count: '{0}'")]
    InvalidTotal(String),
}

/// Reads the declared total result count of a search response
pub fn total_results(body: &str) -> Result<u64, ExtractionError> {
    let root: Value = serde_json::from_str(body)?;
    let results = container(&root, "search-results")?;
    let raw = text(results, "opensearch:totalResults");
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ExtractionError::InvalidTotal(raw))
}

/// Extracts the article identities listed on one search page
///
/// Only the identity is read here; full records are fetched separately.
pub fn search_identities(body: &str) -> Result<Vec<String>, ExtractionError> {
    let root: Value = serde_json::from_str(body)?;
    let results = container(&root, "search-results")?;

    Ok(list(results.get("entry"))
        .into_iter()
        .map(|entry| strip_scopus_prefix(&text(entry, "dc:identifier")))
        .filter(|id| !id.is_empty())
        .collect())
}

/// Extracts a full article record with its sub-entities and reference stubs
///
/// `requested_id` stands in when the response omits `dc:identifier`.
pub fn article(body: &str, requested_id: &str) -> Result<Article, ExtractionError> {
    let root: Value = serde_json::from_str(body)?;
    let response = container(&root, "abstracts-retrieval-response")?;
    let coredata = response.get("coredata").unwrap_or(&Value::Null);

    let mut scopus_id = strip_scopus_prefix(&text(coredata, "dc:identifier"));
    if scopus_id.is_empty() {
        scopus_id = requested_id.trim().to_string();
    }
    if scopus_id.is_empty() {
        return Err(ExtractionError::MissingIdentity);
    }

    Ok(Article {
        scopus_id,
        title: text(coredata, "dc:title"),
        abstracts: text(coredata, "dc:description"),
        publication_date: text(coredata, "prism:coverDate"),
        citations_count: text(coredata, "citedby-count").parse().unwrap_or(0),
        publication_type: text(coredata, "prism:aggregationType"),
        publication_title: text(coredata, "prism:publicationName"),
        doi: text(coredata, "prism:doi"),
        affiliations: article_affiliations(response),
        authors: authors(response),
        keywords: keywords(response),
        subject_areas: subject_areas(response),
        references: references(response),
        resolved: true,
    })
}

/// Extracts a single affiliation record
pub fn affiliation(body: &str, id: &str) -> Result<Affiliation, ExtractionError> {
    let root: Value = serde_json::from_str(body)?;
    let response = container(&root, "affiliation-retrieval-response")?;
    let address = response
        .get("institution-profile")
        .and_then(|profile| profile.get("address"))
        .unwrap_or(&Value::Null);

    Ok(Affiliation {
        scopus_id: id.to_string(),
        title: text(response, "affiliation-name"),
        country: text(response, "country"),
        city: text(response, "city"),
        state: text(address, "state"),
        postal_code: text(address, "postal-code"),
        address: text(response, "address"),
    })
}

fn article_affiliations(response: &Value) -> Vec<Affiliation> {
    list(response.get("affiliation"))
        .into_iter()
        .map(|node| Affiliation {
            scopus_id: text(node, "@id"),
            title: text(node, "affilname"),
            country: text(node, "affiliation-country"),
            city: text(node, "affiliation-city"),
            ..Affiliation::default()
        })
        .collect()
}

fn authors(response: &Value) -> Vec<Author> {
    let authors = response
        .get("authors")
        .and_then(|authors| authors.get("author"));

    list(authors)
        .into_iter()
        .map(|node| Author {
            scopus_id: text(node, "@auid"),
            initials: text(node, "ce:initials"),
            indexed_name: text(node, "ce:indexed-name"),
            surname: text(node, "ce:surname"),
            name: node
                .get("preferred-name")
                .map(|name| text(name, "ce:given-name"))
                .unwrap_or_default(),
            affiliation_ids: list(node.get("affiliation"))
                .into_iter()
                .map(|aff| text(aff, "@id"))
                .filter(|id| !id.is_empty())
                .collect(),
        })
        .collect()
}

fn keywords(response: &Value) -> Vec<Keyword> {
    let keywords = response
        .get("authkeywords")
        .and_then(|k| k.get("author-keyword"));

    list(keywords)
        .into_iter()
        .map(|node| text(node, "$"))
        .filter(|value| !value.is_empty())
        .map(|value| Keyword::new(&value))
        .collect()
}

fn subject_areas(response: &Value) -> Vec<SubjectArea> {
    let areas = response
        .get("subject-areas")
        .and_then(|s| s.get("subject-area"));

    list(areas)
        .into_iter()
        .map(|node| SubjectArea::new(&text(node, "@abbrev"), &text(node, "@code"), &text(node, "$")))
        .collect()
}

fn references(response: &Value) -> Vec<Article> {
    let bibliography = ["item", "bibrecord", "tail", "bibliography", "reference"]
        .iter()
        .try_fold(response, |node, key| node.get(*key));

    list(bibliography)
        .into_iter()
        .map(|reference| {
            let info = reference.get("ref-info").unwrap_or(&Value::Null);
            let source_title = text(info, "ref-sourcetitle");
            let title = info
                .get("ref-title")
                .map(|t| text(t, "ref-titletext"))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| source_title.clone());

            Article {
                scopus_id: reference_identity(info),
                title,
                publication_title: source_title,
                publication_date: publication_year(info),
                authors: reference_authors(info),
                resolved: false,
                ..Article::default()
            }
        })
        .collect()
}

/// Prefers the Scopus group identifier among a reference's item ids
fn reference_identity(info: &Value) -> String {
    let item_ids = info
        .get("refd-itemidlist")
        .and_then(|ids| ids.get("itemid"));
    let candidates = list(item_ids);

    let chosen = candidates
        .iter()
        .find(|id| text(id, "@idtype") == "SGR")
        .or_else(|| candidates.first());

    chosen
        .map(|id| strip_scopus_prefix(&text(id, "$")))
        .unwrap_or_default()
}

fn publication_year(info: &Value) -> String {
    match info.get("ref-publicationyear") {
        Some(year @ Value::Object(_)) => text(year, "@first"),
        _ => text(info, "ref-publicationyear"),
    }
}

fn reference_authors(info: &Value) -> Vec<Author> {
    let authors = info
        .get("ref-authors")
        .and_then(|authors| authors.get("author"));

    list(authors)
        .into_iter()
        .map(|node| Author {
            initials: text(node, "ce:initials"),
            indexed_name: text(node, "ce:indexed-name"),
            surname: text(node, "ce:surname"),
            ..Author::default()
        })
        .collect()
}

fn container<'a>(root: &'a Value, key: &'static str) -> Result<&'a Value, ExtractionError> {
    root.get(key)
        .filter(|v| v.is_object())
        .ok_or(ExtractionError::MissingContainer(key))
}

/// Treats a bare object as a one-element list
fn list(node: Option<&Value>) -> Vec<&Value> {
    match node {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

fn text(node: &Value, key: &str) -> String {
    match node.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn strip_scopus_prefix(id: &str) -> String {
    id.trim()
        .strip_prefix(SCOPUS_ID_PREFIX)
        .unwrap_or(id.trim())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article_body() -> String {
        json!({
            "abstracts-retrieval-response": {
                "coredata": {
                    "dc:identifier": "SCOPUS_ID:85000000001",
                    "dc:title": "Crawling citation graphs",
                    "dc:description": "We crawl.",
                    "prism:coverDate": "2019-05-01",
                    "citedby-count": "17",
                    "prism:aggregationType": "Journal",
                    "prism:publicationName": "Journal of Crawling",
                    "prism:doi": "10.1000/crawl"
                },
                "affiliation": {
                    "@id": "60000001",
                    "affilname": "Crawl University",
                    "affiliation-city": "Leiden",
                    "affiliation-country": "Netherlands"
                },
                "authors": {
                    "author": [
                        {
                            "@auid": "7000000001",
                            "ce:initials": "A.",
                            "ce:indexed-name": "Smith A.",
                            "ce:surname": "Smith",
                            "preferred-name": { "ce:given-name": "Alice" },
                            "affiliation": [{ "@id": "60000001" }, { "@id": "60000002" }]
                        },
                        {
                            "@auid": "7000000002",
                            "ce:surname": "Jones",
                            "affiliation": { "@id": "60000001" }
                        }
                    ]
                },
                "authkeywords": {
                    "author-keyword": [{ "$": "crawling" }, { "$": "citations" }]
                },
                "subject-areas": {
                    "subject-area": { "@abbrev": "COMP", "@code": "1700", "$": "Computer Science" }
                },
                "item": { "bibrecord": { "tail": { "bibliography": { "reference": [
                    {
                        "ref-info": {
                            "ref-sourcetitle": "Proc. Crawl",
                            "ref-publicationyear": { "@first": "2001" },
                            "refd-itemidlist": { "itemid": [
                                { "$": "12345", "@idtype": "CAR-ID" },
                                { "$": "0034000001", "@idtype": "SGR" }
                            ] },
                            "ref-authors": { "author": { "ce:surname": "Page", "ce:initials": "L." } }
                        }
                    },
                    {
                        "ref-info": {
                            "ref-title": { "ref-titletext": "An untracked report" },
                            "ref-sourcetitle": "Tech Reports"
                        }
                    }
                ] } } } }
            }
        })
        .to_string()
    }

    #[test]
    fn test_extract_article_coredata() {
        let article = article(&article_body(), "85000000001").unwrap();

        assert_eq!(article.scopus_id, "85000000001");
        assert_eq!(article.title, "Crawling citation graphs");
        assert_eq!(article.citations_count, 17);
        assert_eq!(article.publication_title, "Journal of Crawling");
        assert_eq!(article.doi, "10.1000/crawl");
        assert!(article.resolved);
    }

    #[test]
    fn test_extract_article_sub_entities() {
        let article = article(&article_body(), "85000000001").unwrap();

        assert_eq!(article.affiliations.len(), 1);
        assert_eq!(article.affiliations[0].city, "Leiden");

        assert_eq!(article.authors.len(), 2);
        assert_eq!(article.authors[0].name, "Alice");
        assert_eq!(article.authors[0].affiliation_ids, vec!["60000001", "60000002"]);
        assert_eq!(article.authors[1].affiliation_ids, vec!["60000001"]);

        assert_eq!(article.keywords.len(), 2);
        assert_eq!(article.keywords[0].value, "crawling");

        assert_eq!(article.subject_areas.len(), 1);
        assert_eq!(article.subject_areas[0].code, "1700");
        assert_eq!(article.subject_areas[0].description, "Computer Science");
    }

    #[test]
    fn test_extract_reference_stubs() {
        let article = article(&article_body(), "85000000001").unwrap();

        assert_eq!(article.references.len(), 2);
        let first = &article.references[0];
        assert_eq!(first.scopus_id, "0034000001");
        assert_eq!(first.publication_date, "2001");
        assert_eq!(first.title, "Proc. Crawl");
        assert_eq!(first.authors[0].surname, "Page");
        assert!(!first.resolved);

        let second = &article.references[1];
        assert!(second.scopus_id.is_empty());
        assert_eq!(second.title, "An untracked report");
    }

    #[test]
    fn test_article_falls_back_to_requested_identity() {
        let body = json!({ "abstracts-retrieval-response": { "coredata": {} } }).to_string();
        assert_eq!(article(&body, "42").unwrap().scopus_id, "42");
        assert!(matches!(
            article(&body, ""),
            Err(ExtractionError::MissingIdentity)
        ));
    }

    #[test]
    fn test_article_missing_container() {
        let body = json!({ "service-error": { "status": "RESOURCE_NOT_FOUND" } }).to_string();
        assert!(matches!(
            article(&body, "42"),
            Err(ExtractionError::MissingContainer("abstracts-retrieval-response"))
        ));
    }

    #[test]
    fn test_search_identities() {
        let body = json!({
            "search-results": {
                "opensearch:totalResults": "2",
                "entry": [
                    { "dc:identifier": "SCOPUS_ID:1" },
                    { "dc:identifier": "SCOPUS_ID:2" },
                    { "error": "Result set was empty" }
                ]
            }
        })
        .to_string();

        assert_eq!(search_identities(&body).unwrap(), vec!["1", "2"]);
        assert_eq!(total_results(&body).unwrap(), 2);
    }

    #[test]
    fn test_search_without_container_fails() {
        assert!(matches!(
            search_identities("{}"),
            Err(ExtractionError::MissingContainer("search-results"))
        ));
        assert!(matches!(search_identities("<html>"), Err(ExtractionError::Json(_))));
    }

    #[test]
    fn test_invalid_total() {
        let body = json!({ "search-results": { "opensearch:totalResults": "many" } }).to_string();
        assert!(matches!(
            total_results(&body),
            Err(ExtractionError::InvalidTotal(_))
        ));
    }

    #[test]
    fn test_extract_affiliation() {
        let body = json!({
            "affiliation-retrieval-response": {
                "affiliation-name": "Crawl University",
                "address": "Rapenburg 70",
                "city": "Leiden",
                "country": "Netherlands",
                "institution-profile": { "address": { "postal-code": "2311 EZ", "state": "South Holland" } }
            }
        })
        .to_string();

        let affiliation = affiliation(&body, "60000001").unwrap();
        assert_eq!(affiliation.scopus_id, "60000001");
        assert_eq!(affiliation.title, "Crawl University");
        assert_eq!(affiliation.postal_code, "2311 EZ");
        assert_eq!(affiliation.state, "South Holland");
    }
}
