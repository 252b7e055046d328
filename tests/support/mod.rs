#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use monarch_bridge::app::App;
use monarch_bridge::domain::{AssociationCategory, Identifier};
use monarch_bridge::error::BridgeError;
use monarch_bridge::monarch::{
    AssociationPage, MonarchClient, RawAssociation, RawEntity, SearchPage, SearchQuery,
};
use monarch_bridge::providers::isbn::{BookMetadata, IsbnClient};
use monarch_bridge::providers::publication::PublicationResolver;
use monarch_bridge::providers::pubmed::{CitationClient, CitationMetadata};
use monarch_bridge::semsim::{SemsimClient, SimilarityPage, SimilarityQuery};

pub const UI_URL: &str = "https://monarchinitiative.org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationCall {
    pub category: AssociationCategory,
    pub entity: String,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Default)]
pub struct MockMonarch {
    pub pages: HashMap<AssociationCategory, AssociationPage>,
    pub failing: HashSet<AssociationCategory>,
    pub delays: HashMap<String, Duration>,
    pub search_page: SearchPage,
    pub entities: HashMap<String, RawEntity>,
    pub association_calls: Mutex<Vec<AssociationCall>>,
    pub search_calls: Mutex<Vec<SearchQuery>>,
}

impl MockMonarch {
    pub fn with_page(mut self, category: AssociationCategory, page: AssociationPage) -> Self {
        self.pages.insert(category, page);
        self
    }

    pub fn with_entity(mut self, entity: RawEntity) -> Self {
        if let Some(id) = entity.id.clone() {
            self.entities.insert(id, entity);
        }
        self
    }

    /// Delays any lookup keyed by `key` (entity id or category tag).
    pub fn with_delay(mut self, key: &str, millis: u64) -> Self {
        self.delays.insert(key.to_string(), Duration::from_millis(millis));
        self
    }

    async fn pause(&self, key: &str) {
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl MonarchClient for MockMonarch {
    async fn fetch_associations(
        &self,
        category: AssociationCategory,
        entity: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationPage, BridgeError> {
        self.association_calls.lock().unwrap().push(AssociationCall {
            category,
            entity: entity.as_str().to_string(),
            limit,
            offset,
        });
        self.pause(category.as_str()).await;
        if self.failing.contains(&category) {
            return Err(BridgeError::MonarchStatus {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self.pages.get(&category).cloned().unwrap_or_default())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, BridgeError> {
        self.search_calls.lock().unwrap().push(query.clone());
        Ok(self.search_page.clone())
    }

    async fn entity(&self, id: &Identifier) -> Result<RawEntity, BridgeError> {
        self.pause(id.as_str()).await;
        self.entities
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| BridgeError::MonarchStatus {
                status: 404,
                message: format!("{id} not found"),
            })
    }
}

#[derive(Default)]
pub struct MockSemsim {
    pub page: SimilarityPage,
    pub fail: bool,
    pub calls: Mutex<Vec<SimilarityQuery>>,
}

#[async_trait]
impl SemsimClient for MockSemsim {
    async fn search(&self, query: &SimilarityQuery) -> Result<SimilarityPage, BridgeError> {
        self.calls.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(BridgeError::SemsimHttp("connection refused".to_string()));
        }
        Ok(self.page.clone())
    }
}

#[derive(Default)]
pub struct MockIsbn {
    pub books: HashMap<String, BookMetadata>,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl IsbnClient for MockIsbn {
    async fn lookup(&self, isbn: &str) -> Result<BookMetadata, BridgeError> {
        self.calls.lock().unwrap().push(isbn.to_string());
        self.books
            .get(isbn)
            .cloned()
            .ok_or_else(|| BridgeError::OpenLibraryHttp("timed out".to_string()))
    }
}

#[derive(Default)]
pub struct MockCitations {
    pub articles: HashMap<String, CitationMetadata>,
    pub delays: HashMap<String, Duration>,
    /// Applied to every lookup without its own entry in `delays`.
    pub latency: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

#[async_trait]
impl CitationClient for MockCitations {
    async fn summary(&self, pmid: &str) -> Result<CitationMetadata, BridgeError> {
        self.calls.lock().unwrap().push(pmid.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(pmid).copied().or(self.latency) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.articles
            .get(pmid)
            .cloned()
            .ok_or_else(|| BridgeError::PubmedStatus {
                status: 500,
                message: "internal error".to_string(),
            })
    }
}

pub struct Harness {
    pub monarch: Arc<MockMonarch>,
    pub semsim: Arc<MockSemsim>,
    pub isbn: Arc<MockIsbn>,
    pub citations: Arc<MockCitations>,
}

impl Harness {
    pub fn new(monarch: MockMonarch) -> Self {
        Self {
            monarch: Arc::new(monarch),
            semsim: Arc::new(MockSemsim::default()),
            isbn: Arc::new(MockIsbn::default()),
            citations: Arc::new(MockCitations::default()),
        }
    }

    pub fn with_semsim(mut self, semsim: MockSemsim) -> Self {
        self.semsim = Arc::new(semsim);
        self
    }

    pub fn with_isbn(mut self, isbn: MockIsbn) -> Self {
        self.isbn = Arc::new(isbn);
        self
    }

    pub fn with_citations(mut self, citations: MockCitations) -> Self {
        self.citations = Arc::new(citations);
        self
    }

    pub fn resolver(&self) -> PublicationResolver {
        PublicationResolver::new(self.isbn.clone(), self.citations.clone())
    }

    pub fn app(&self) -> App {
        App::new(
            self.monarch.clone(),
            self.semsim.clone(),
            self.resolver(),
            UI_URL,
        )
    }
}

pub fn association(id: &str, subject: (&str, &str), object: (&str, &str)) -> RawAssociation {
    RawAssociation {
        id: Some(id.to_string()),
        subject: Some(subject.0.to_string()),
        subject_label: Some(subject.1.to_string()),
        object: Some(object.0.to_string()),
        object_label: Some(object.1.to_string()),
        ..RawAssociation::default()
    }
}

pub fn page(items: Vec<RawAssociation>, total: u64) -> AssociationPage {
    AssociationPage { items, total }
}

pub fn id(value: &str) -> Identifier {
    value.parse().unwrap()
}

pub fn fixture(name: &str) -> serde_json::Value {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}
