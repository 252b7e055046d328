//! NCBI E-utilities `esummary` lookups for PubMed ids.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::error::BridgeError;
use crate::monarch::build_http_client;
use crate::providers::isbn::first_year;

pub const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<String>,
    pub journal: Option<String>,
}

#[async_trait]
pub trait CitationClient: Send + Sync {
    async fn summary(&self, pmid: &str) -> Result<CitationMetadata, BridgeError>;
}

#[derive(Clone)]
pub struct PubmedHttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PubmedHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, BridgeError> {
        let client =
            build_http_client(settings).map_err(|err| BridgeError::PubmedHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.eutils_url.clone(),
            api_key: settings.ncbi_api_key.clone(),
        })
    }

    fn params(&self, pmid: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", pmid.to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }
}

#[async_trait]
impl CitationClient for PubmedHttpClient {
    async fn summary(&self, pmid: &str) -> Result<CitationMetadata, BridgeError> {
        let url = format!("{}/esummary.fcgi", self.base_url);
        debug!(event = "pubmed_call", url = %url, pmid);

        let response = self
            .client
            .get(&url)
            .query(&self.params(pmid))
            .send()
            .await
            .map_err(|err| BridgeError::PubmedHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "PubMed request failed".to_string());
            return Err(BridgeError::PubmedStatus { status, message });
        }
        let raw: Value = response
            .json()
            .await
            .map_err(|err| BridgeError::PubmedHttp(err.to_string()))?;
        extract_citation(&raw, pmid)
    }
}

/// Reads one document summary from an `esummary` JSON payload.
pub fn extract_citation(raw: &Value, pmid: &str) -> Result<CitationMetadata, BridgeError> {
    let doc = &raw["result"][pmid];
    if !doc.is_object() || doc.get("error").is_some() {
        return Err(BridgeError::PublicationNotFound(format!("PMID:{pmid}")));
    }

    let title = doc["title"]
        .as_str()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string());
    let authors = doc["authors"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|author| author["name"].as_str())
                .map(|name| name.to_string())
                .collect()
        })
        .unwrap_or_default();
    let year = doc["pubdate"]
        .as_str()
        .and_then(first_year)
        .or_else(|| doc["epubdate"].as_str().and_then(first_year));
    let journal = doc["source"]
        .as_str()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string());

    Ok(CitationMetadata {
        title,
        authors,
        year,
        journal,
    })
}
