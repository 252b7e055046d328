use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::config::DEFAULT_PUBLICATION_CONCURRENCY;
use crate::error::BridgeError;
use crate::providers::isbn::{IsbnClient, OPENLIBRARY_ISBN_URL, canonical_isbn};
use crate::providers::pubmed::{CitationClient, PUBMED_ARTICLE_URL};

pub const OMIM_ENTRY_URL: &str = "https://www.omim.org/entry";

/// Normalized citation attached to an association. `status` is set only
/// when a lookup failed, and then every other optional field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        rename = "author(s)",
        skip_serializing_if = "Option::is_none"
    )]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PublicationRecord {
    pub fn bare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn failed(id: &str, scheme: PublicationScheme) -> Self {
        Self {
            id: id.to_string(),
            status: Some(format!(
                "Error fetching publication info for {} {}",
                scheme.label(),
                id
            )),
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationScheme {
    Isbn,
    Omim,
    Pmid,
    Other,
}

impl PublicationScheme {
    /// Case-sensitive prefix match, ISBN before OMIM before PMID.
    pub fn detect(pub_id: &str) -> Self {
        if pub_id.starts_with("ISBN") {
            PublicationScheme::Isbn
        } else if pub_id.starts_with("OMIM") {
            PublicationScheme::Omim
        } else if pub_id.starts_with("PMID") {
            PublicationScheme::Pmid
        } else {
            PublicationScheme::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PublicationScheme::Isbn => "ISBN",
            PublicationScheme::Omim => "OMIM",
            PublicationScheme::Pmid => "PMID",
            PublicationScheme::Other => "publication",
        }
    }
}

/// One author verbatim, several as `"<first> et al."`.
pub fn render_authors(authors: &[String]) -> Option<String> {
    match authors {
        [] => None,
        [single] => Some(single.clone()),
        [first, ..] => Some(format!("{first} et al.")),
    }
}

/// Text after the first `:` of a scheme-prefixed id.
pub fn local_code(pub_id: &str) -> &str {
    pub_id
        .split_once(':')
        .map(|(_, local)| local)
        .unwrap_or(pub_id)
        .trim()
}

#[derive(Clone)]
pub struct PublicationResolver {
    isbn: Arc<dyn IsbnClient>,
    citations: Arc<dyn CitationClient>,
    enabled: bool,
    /// Shared by clones, so the bound holds across every request in flight.
    limiter: Arc<Semaphore>,
}

impl PublicationResolver {
    pub fn new(isbn: Arc<dyn IsbnClient>, citations: Arc<dyn CitationClient>) -> Self {
        Self {
            isbn,
            citations,
            enabled: true,
            limiter: Arc::new(Semaphore::new(DEFAULT_PUBLICATION_CONCURRENCY)),
        }
    }

    /// Caps concurrent ISBN/PMID lookups at `max_in_flight` (at least one).
    pub fn with_concurrency(self, max_in_flight: usize) -> Self {
        Self {
            limiter: Arc::new(Semaphore::new(max_in_flight.max(1))),
            ..self
        }
    }

    /// A resolver that never calls out and returns bare records.
    pub fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    pub async fn resolve(&self, pub_id: &str) -> PublicationRecord {
        if !self.enabled {
            return PublicationRecord::bare(pub_id);
        }
        let scheme = PublicationScheme::detect(pub_id);
        let result = match scheme {
            PublicationScheme::Isbn => self.resolve_isbn(pub_id).await,
            PublicationScheme::Omim => Ok(omim_record(pub_id)),
            PublicationScheme::Pmid => self.resolve_pmid(pub_id).await,
            PublicationScheme::Other => Ok(PublicationRecord::bare(pub_id)),
        };
        result.unwrap_or_else(|err| {
            warn!(publication = pub_id, error = %err, "publication lookup failed");
            PublicationRecord::failed(pub_id, scheme)
        })
    }

    /// Resolves concurrently, bounded by the lookup limiter; output order
    /// matches `pub_ids`.
    pub async fn resolve_all(&self, pub_ids: &[String]) -> Vec<PublicationRecord> {
        join_all(pub_ids.iter().map(|pub_id| self.resolve(pub_id))).await
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, BridgeError> {
        self.limiter
            .acquire()
            .await
            .map_err(|err| BridgeError::Server(format!("publication limiter closed: {err}")))
    }

    async fn resolve_isbn(&self, pub_id: &str) -> Result<PublicationRecord, BridgeError> {
        let isbn = canonical_isbn(local_code(pub_id));
        if isbn.is_empty() {
            return Err(BridgeError::PublicationNotFound(pub_id.to_string()));
        }
        let book = {
            let _permit = self.permit().await?;
            self.isbn.lookup(&isbn).await?
        };
        Ok(PublicationRecord {
            id: pub_id.to_string(),
            title: book.title,
            authors: render_authors(&book.authors),
            year: book.year,
            publisher: book.publisher,
            journal: None,
            url: Some(format!("{OPENLIBRARY_ISBN_URL}/{isbn}")),
            status: None,
        })
    }

    async fn resolve_pmid(&self, pub_id: &str) -> Result<PublicationRecord, BridgeError> {
        let pmid = local_code(pub_id);
        if pmid.is_empty() || !pmid.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(BridgeError::PublicationNotFound(pub_id.to_string()));
        }
        let citation = {
            let _permit = self.permit().await?;
            self.citations.summary(pmid).await?
        };
        Ok(PublicationRecord {
            id: pub_id.to_string(),
            title: citation.title,
            authors: render_authors(&citation.authors),
            year: citation.year,
            publisher: None,
            journal: citation.journal,
            url: Some(format!("{PUBMED_ARTICLE_URL}/{pmid}")),
            status: None,
        })
    }
}

pub fn omim_record(pub_id: &str) -> PublicationRecord {
    PublicationRecord {
        id: pub_id.to_string(),
        title: Some("OMIM Record".to_string()),
        url: Some(format!("{OMIM_ENTRY_URL}/{}", local_code(pub_id))),
        ..PublicationRecord::default()
    }
}
