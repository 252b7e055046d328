use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use tracing::debug;

use crate::config::Settings;
use crate::domain::Identifier;
use crate::error::BridgeError;
use crate::monarch::{build_http_client, null_as_default};

/// Similarity metric always requested from the upstream engine.
pub const SIMILARITY_METRIC: &str = "phenodigm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityQuery {
    pub ids: Vec<Identifier>,
    pub is_feature_set: bool,
    pub limit: u32,
}

impl SimilarityQuery {
    /// Feature-set mode is selected only when every id is a phenotype.
    pub fn new(ids: Vec<Identifier>, limit: u32) -> Self {
        let is_feature_set = is_feature_set(&ids);
        Self {
            ids,
            is_feature_set,
            limit,
        }
    }
}

pub fn is_feature_set(ids: &[Identifier]) -> bool {
    ids.iter().all(Identifier::is_phenotype)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawTaxon {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawMatch {
    #[serde(default, deserialize_with = "string_or_number")]
    pub rank: Option<String>,
    #[serde(default)]
    pub score: Option<Number>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub taxon: Option<RawTaxon>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawSimilarityMetadata {
    #[serde(default)]
    pub max_max_ic: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SimilarityPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub matches: Vec<RawMatch>,
    #[serde(default)]
    pub metadata: Option<RawSimilarityMetadata>,
}

#[async_trait]
pub trait SemsimClient: Send + Sync {
    async fn search(&self, query: &SimilarityQuery) -> Result<SimilarityPage, BridgeError>;
}

#[derive(Clone)]
pub struct SemsimHttpClient {
    client: Client,
    base_url: String,
}

impl SemsimHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, BridgeError> {
        let client =
            build_http_client(settings).map_err(|err| BridgeError::SemsimHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.monarch_api_v2_url.clone(),
        })
    }
}

#[async_trait]
impl SemsimClient for SemsimHttpClient {
    async fn search(&self, query: &SimilarityQuery) -> Result<SimilarityPage, BridgeError> {
        let url = format!("{}/sim/search", self.base_url);
        let params = query_params(query);
        debug!(event = "monarch_api_call_v2", url = %url, ?params);

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|err| BridgeError::SemsimHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "similarity search failed".to_string());
            return Err(BridgeError::SemsimStatus { status, message });
        }
        response
            .json()
            .await
            .map_err(|err| BridgeError::SemsimHttp(err.to_string()))
    }
}

/// Repeated `id` pairs followed by the fixed mode/metric/limit params.
pub fn query_params(query: &SimilarityQuery) -> Vec<(&'static str, String)> {
    let mut params = query
        .ids
        .iter()
        .map(|id| ("id", id.as_str().to_string()))
        .collect::<Vec<_>>();
    params.push(("is_feature_set", query.is_feature_set.to_string()));
    params.push(("metric", SIMILARITY_METRIC.to_string()));
    params.push(("limit", query.limit.to_string()));
    params
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => Some(value),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    })
}
