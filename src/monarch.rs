use async_trait::async_trait;
use reqwest::{Client, Url};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Settings;
use crate::domain::{AssociationCategory, Identifier, Slot};
use crate::error::BridgeError;

/// Raw row from `/association/all`. Fields this crate does not interpret
/// are kept in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawAssociation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub subject_label: Option<String>,
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub object_label: Option<String>,
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub frequency_qualifier: Option<String>,
    #[serde(default)]
    pub onset_qualifier: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub publications: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawAssociation {
    /// `(id, label)` held in the given triple slot.
    pub fn entity_at(&self, slot: Slot) -> (Option<&str>, Option<&str>) {
        match slot {
            Slot::Subject => (self.subject.as_deref(), self.subject_label.as_deref()),
            Slot::Object => (self.object.as_deref(), self.object_label.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AssociationPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<RawAssociation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub category: String,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawSearchItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub category: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SearchPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<RawSearchItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawAssociationCount {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawEntity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub category: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub synonym: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub association_counts: Vec<RawAssociationCount>,
}

/// Knowledge-graph API consumed by the mappers.
#[async_trait]
pub trait MonarchClient: Send + Sync {
    async fn fetch_associations(
        &self,
        category: AssociationCategory,
        entity: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationPage, BridgeError>;

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, BridgeError>;

    async fn entity(&self, id: &Identifier) -> Result<RawEntity, BridgeError>;
}

#[derive(Clone)]
pub struct MonarchHttpClient {
    client: Client,
    base_url: String,
}

impl MonarchHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, BridgeError> {
        let client = build_http_client(settings)
            .map_err(|err| BridgeError::MonarchHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.monarch_api_url.clone(),
        })
    }

    async fn handle_status(response: reqwest::Response) -> Result<reqwest::Response, BridgeError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Monarch request failed".to_string());
        Err(BridgeError::MonarchStatus { status, message })
    }

    async fn get_json<T>(&self, request: reqwest::RequestBuilder) -> Result<T, BridgeError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request
            .send()
            .await
            .map_err(|err| BridgeError::MonarchHttp(err.to_string()))?;
        let response = Self::handle_status(response).await?;
        response
            .json()
            .await
            .map_err(|err| BridgeError::MonarchHttp(err.to_string()))
    }
}

#[async_trait]
impl MonarchClient for MonarchHttpClient {
    async fn fetch_associations(
        &self,
        category: AssociationCategory,
        entity: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationPage, BridgeError> {
        let url = format!("{}/association/all", self.base_url);
        debug!(
            event = "monarch_api_call",
            url = %url,
            category = category.as_str(),
            entity = entity.as_str(),
            limit,
            offset
        );
        let limit = limit.to_string();
        let offset = offset.to_string();
        let request = self.client.get(&url).query(&[
            ("category", category.as_str()),
            ("entity", entity.as_str()),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ]);
        self.get_json(request).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, BridgeError> {
        let url = format!("{}/search", self.base_url);
        debug!(
            event = "monarch_api_call",
            url = %url,
            term = %query.term,
            category = %query.category,
            limit = query.limit,
            offset = query.offset
        );
        let limit = query.limit.to_string();
        let offset = query.offset.to_string();
        let request = self.client.get(&url).query(&[
            ("q", query.term.as_str()),
            ("category", query.category.as_str()),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ]);
        self.get_json(request).await
    }

    async fn entity(&self, id: &Identifier) -> Result<RawEntity, BridgeError> {
        let url = entity_url(&self.base_url, id)?;
        debug!(event = "monarch_api_call", url = %url);
        self.get_json(self.client.get(url)).await
    }
}

/// `<base>/entity/<id>` with the id as a single percent-encoded segment.
pub fn entity_url(base_url: &str, id: &Identifier) -> Result<Url, BridgeError> {
    let mut url = Url::parse(base_url).map_err(|err| BridgeError::MonarchHttp(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| BridgeError::MonarchHttp(format!("not a base URL: {base_url}")))?
        .pop_if_empty()
        .push("entity")
        .push(id.as_str());
    Ok(url)
}

/// Shared reqwest client builder for every outbound collaborator.
pub(crate) fn build_http_client(settings: &Settings) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("monarch-bridge/", env!("CARGO_PKG_VERSION"))),
    );
    Client::builder()
        .default_headers(headers)
        .timeout(settings.request_timeout)
        .build()
}

/// Treats an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `"x"`, `["x", "y"]` or `null` for list-valued fields.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_items_and_publications_normalize_to_empty() {
        let page: AssociationPage = serde_json::from_value(serde_json::json!({
            "items": null,
            "total": 0
        }))
        .unwrap();
        assert!(page.items.is_empty());

        let page: AssociationPage = serde_json::from_value(serde_json::json!({
            "items": [
                {"id": "a1", "subject": "HGNC:1", "object": "MONDO:1", "publications": null},
                {"id": "a2", "subject": "HGNC:2", "object": "MONDO:1"}
            ],
            "total": 2
        }))
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|item| item.publications.is_empty()));
    }

    #[test]
    fn unknown_fields_pass_through() {
        let item: RawAssociation = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "subject": "HGNC:1884",
            "subject_label": "CFTR",
            "negated": false,
            "provided_by": "hpoa"
        }))
        .unwrap();
        assert_eq!(item.extra.get("provided_by"), Some(&Value::from("hpoa")));
        assert_eq!(item.entity_at(Slot::Subject), (Some("HGNC:1884"), Some("CFTR")));
        assert_eq!(item.entity_at(Slot::Object), (None, None));
    }

    #[test]
    fn entity_id_stays_in_one_path_segment() {
        let base = "https://api-v3.monarchinitiative.org/v3/api";
        let url = |raw: &str| entity_url(base, &raw.parse().unwrap()).unwrap();

        assert_eq!(
            url("HGNC:1884").as_str(),
            "https://api-v3.monarchinitiative.org/v3/api/entity/HGNC:1884"
        );
        let traversal = url("../association/all");
        assert_eq!(traversal.path(), "/v3/api/entity/..%2Fassociation%2Fall");
        let query = url("HP:1?category=x");
        assert_eq!(query.path(), "/v3/api/entity/HP:1%3Fcategory=x");
        assert_eq!(query.query(), None);
        let fragment = url("HP:1#frag");
        assert_eq!(fragment.path(), "/v3/api/entity/HP:1%23frag");
        assert_eq!(fragment.fragment(), None);
    }

    #[test]
    fn category_accepts_string_or_list() {
        let item: RawSearchItem = serde_json::from_value(serde_json::json!({
            "id": "MONDO:0100096",
            "category": "biolink:Disease"
        }))
        .unwrap();
        assert_eq!(item.category, vec!["biolink:Disease".to_string()]);

        let entity: RawEntity = serde_json::from_value(serde_json::json!({
            "id": "HGNC:1884",
            "category": ["biolink:Gene", "biolink:NamedThing"]
        }))
        .unwrap();
        assert_eq!(entity.category.len(), 2);
    }

    #[test]
    fn missing_entity_lists_default_empty() {
        let entity: RawEntity = serde_json::from_value(serde_json::json!({
            "id": "HP:0002721",
            "name": "Immunodeficiency",
            "synonym": null
        }))
        .unwrap();
        assert!(entity.category.is_empty());
        assert!(entity.synonym.is_empty());
        assert!(entity.association_counts.is_empty());
    }
}
