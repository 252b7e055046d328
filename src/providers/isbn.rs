use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::error::BridgeError;
use crate::monarch::build_http_client;

/// Public book page, independent of the configured API base.
pub const OPENLIBRARY_ISBN_URL: &str = "https://openlibrary.org/isbn";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<String>,
    pub publisher: Option<String>,
}

#[async_trait]
pub trait IsbnClient: Send + Sync {
    async fn lookup(&self, isbn: &str) -> Result<BookMetadata, BridgeError>;
}

#[derive(Clone)]
pub struct OpenLibraryHttpClient {
    client: Client,
    base_url: String,
}

impl OpenLibraryHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, BridgeError> {
        let client = build_http_client(settings)
            .map_err(|err| BridgeError::OpenLibraryHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.openlibrary_url.clone(),
        })
    }
}

#[async_trait]
impl IsbnClient for OpenLibraryHttpClient {
    async fn lookup(&self, isbn: &str) -> Result<BookMetadata, BridgeError> {
        let url = format!("{}/api/books", self.base_url);
        let bibkey = format!("ISBN:{isbn}");
        debug!(event = "openlibrary_call", url = %url, bibkey = %bibkey);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("bibkeys", bibkey.as_str()),
                ("format", "json"),
                ("jscmd", "data"),
            ])
            .send()
            .await
            .map_err(|err| BridgeError::OpenLibraryHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Open Library request failed".to_string());
            return Err(BridgeError::OpenLibraryStatus { status, message });
        }
        let raw: Value = response
            .json()
            .await
            .map_err(|err| BridgeError::OpenLibraryHttp(err.to_string()))?;
        extract_book_metadata(&raw, isbn)
    }
}

/// Digits and check character only, e.g. `978-0721606156` → `9780721606156`.
pub fn canonical_isbn(local: &str) -> String {
    local
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == 'X' || *ch == 'x')
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

/// Reads one book from an Open Library `jscmd=data` response.
pub fn extract_book_metadata(raw: &Value, isbn: &str) -> Result<BookMetadata, BridgeError> {
    let book = raw
        .get(format!("ISBN:{isbn}"))
        .filter(|value| value.is_object())
        .ok_or_else(|| BridgeError::PublicationNotFound(format!("ISBN:{isbn}")))?;

    let title = book
        .get("title")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());
    let authors = book
        .get("authors")
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|author| author.get("name").and_then(|v| v.as_str()))
                .map(|name| name.to_string())
                .collect()
        })
        .unwrap_or_default();
    let year = book
        .get("publish_date")
        .and_then(|v| v.as_str())
        .and_then(first_year);
    let publisher = book
        .get("publishers")
        .and_then(|v| v.as_array())
        .and_then(|list| list.first())
        .and_then(|v| v.get("name").or(Some(v)))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());

    Ok(BookMetadata {
        title,
        authors,
        year,
        publisher,
    })
}

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

/// First four-digit run, e.g. `"2009 Mar"` or `"May 12, 2006"`.
pub fn first_year(text: &str) -> Option<String> {
    YEAR_RE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
