mod support;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use monarch_bridge::providers::isbn::extract_book_metadata;
use monarch_bridge::providers::publication::PublicationResolver;
use monarch_bridge::providers::pubmed::extract_citation;

use support::{MockCitations, MockIsbn, fixture};

fn smith_isbn() -> MockIsbn {
    let book = extract_book_metadata(&fixture("openlibrary_9780721606156.json"), "9780721606156")
        .unwrap();
    MockIsbn {
        books: HashMap::from([("9780721606156".to_string(), book)]),
        ..MockIsbn::default()
    }
}

fn rubinstein_citation() -> MockCitations {
    let article = extract_citation(&fixture("pubmed_19204439.json"), "19204439").unwrap();
    MockCitations {
        articles: HashMap::from([("19204439".to_string(), article)]),
        ..MockCitations::default()
    }
}

struct Setup {
    resolver: PublicationResolver,
    isbn: Arc<MockIsbn>,
    citations: Arc<MockCitations>,
}

fn build(isbn: MockIsbn, citations: MockCitations) -> Setup {
    let isbn = Arc::new(isbn);
    let citations = Arc::new(citations);
    Setup {
        resolver: PublicationResolver::new(isbn.clone(), citations.clone()),
        isbn,
        citations,
    }
}

#[tokio::test]
async fn omim_record_needs_no_network() {
    let setup = build(MockIsbn::default(), MockCitations::default());

    let record = setup.resolver.resolve("OMIM:180849").await;

    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({
            "id": "OMIM:180849",
            "url": "https://www.omim.org/entry/180849",
            "title": "OMIM Record"
        })
    );
    assert!(setup.isbn.calls.lock().unwrap().is_empty());
    assert!(setup.citations.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn isbn13_with_hyphens_resolves_through_open_library() {
    let setup = build(smith_isbn(), MockCitations::default());

    let record = setup.resolver.resolve("ISBN-13:978-0721606156").await;

    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({
            "id": "ISBN-13:978-0721606156",
            "title": "Smith's Recognizable Patterns Of Human Malformation",
            "author(s)": "Kenneth Lyons Jones et al.",
            "year": "2006",
            "publisher": "Saunders",
            "url": "https://openlibrary.org/isbn/9780721606156"
        })
    );
    assert_eq!(
        *setup.isbn.calls.lock().unwrap(),
        vec!["9780721606156".to_string()]
    );
}

#[tokio::test]
async fn pmid_resolves_through_citation_service() {
    let setup = build(MockIsbn::default(), rubinstein_citation());

    let record = setup.resolver.resolve("PMID:19204439").await;

    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({
            "id": "PMID:19204439",
            "title": "Rubinstein Taybi syndrome with hepatic hemangioma.",
            "author(s)": "Sahiner UM et al.",
            "year": "2009",
            "journal": "Med Princ Pract",
            "url": "https://pubmed.ncbi.nlm.nih.gov/19204439"
        })
    );
}

#[tokio::test]
async fn isbn_failure_degrades_to_status_record() {
    let setup = build(MockIsbn::default(), MockCitations::default());

    let record = setup.resolver.resolve("ISBN:0000000000").await;

    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({
            "id": "ISBN:0000000000",
            "status": "Error fetching publication info for ISBN ISBN:0000000000"
        })
    );
}

#[tokio::test]
async fn pmid_failure_recovers_like_isbn() {
    let setup = build(MockIsbn::default(), MockCitations::default());

    let record = setup.resolver.resolve("PMID:1").await;

    assert!(record.is_failed());
    assert_eq!(
        record.status.as_deref(),
        Some("Error fetching publication info for PMID PMID:1")
    );
    assert_eq!(record.title, None);
}

#[tokio::test]
async fn non_numeric_pmid_is_not_looked_up() {
    let setup = build(MockIsbn::default(), MockCitations::default());

    let record = setup.resolver.resolve("PMID:abc").await;

    assert!(record.is_failed());
    assert!(setup.citations.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_scheme_passes_through() {
    let setup = build(smith_isbn(), rubinstein_citation());

    for pub_id in ["DOI:10.1159/000194448", "pmid:19204439", "Reactome:R-HSA-1"] {
        let record = setup.resolver.resolve(pub_id).await;
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"id": pub_id}));
    }
    assert!(setup.citations.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn disabled_resolver_returns_bare_ids() {
    let setup = build(smith_isbn(), rubinstein_citation());
    let resolver = setup.resolver.clone().disabled();

    let records = resolver
        .resolve_all(&["PMID:19204439".to_string(), "OMIM:180849".to_string()])
        .await;

    assert_eq!(
        serde_json::to_value(&records).unwrap(),
        json!([{"id": "PMID:19204439"}, {"id": "OMIM:180849"}])
    );
    assert!(setup.citations.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mixed_batch_isolates_failures() {
    let setup = build(smith_isbn(), rubinstein_citation());

    let records = setup
        .resolver
        .resolve_all(&[
            "PMID:19204439".to_string(),
            "ISBN:123".to_string(),
            "OMIM:180849".to_string(),
        ])
        .await;

    assert_eq!(records.len(), 3);
    assert!(!records[0].is_failed());
    assert!(records[1].is_failed());
    assert_eq!(records[2].title.as_deref(), Some("OMIM Record"));
}
