use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::config::Settings;
use crate::domain::{AssociationCategory, Direction, EntityKind, Identifier};
use crate::error::BridgeError;
use crate::monarch::{
    MonarchClient, MonarchHttpClient, RawAssociation, RawEntity, RawSearchItem, SearchQuery,
};
use crate::providers::isbn::OpenLibraryHttpClient;
use crate::providers::publication::{PublicationRecord, PublicationResolver};
use crate::providers::pubmed::PubmedHttpClient;
use crate::semsim::{RawMatch, SemsimClient, SemsimHttpClient, SimilarityQuery};

pub const DEFAULT_SEARCH_CATEGORY: &str = "biolink:Disease";
pub const DEFAULT_SEARCH_LIMIT: u32 = 2;
pub const DEFAULT_SEARCH_OFFSET: u32 = 0;
pub const DEFAULT_ASSOCIATION_LIMIT: u32 = 10;
/// Upstream pagination is forwarded untouched; 1 is the historical default.
pub const DEFAULT_ASSOCIATION_OFFSET: u32 = 1;
pub const DEFAULT_SIMILARITY_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: Option<String>,
    pub label: Option<String>,
}

/// One related entity. Serialized with the result kind as the entity key,
/// e.g. `{"id", "gene": {..}, "metadata", "publications"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub id: Option<String>,
    pub kind: EntityKind,
    pub entity: NamedEntity,
    pub metadata: Map<String, Value>,
    pub publications: Vec<PublicationRecord>,
}

impl Serialize for Association {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry(self.kind.as_str(), &self.entity)?;
        map.serialize_entry("metadata", &self.metadata)?;
        map.serialize_entry("publications", &self.publications)?;
        map.end()
    }
}

/// `total` is the upstream count (summed over merged categories), not
/// `associations.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationCollection {
    pub kind: EntityKind,
    pub associations: Vec<Association>,
    pub total: u64,
    pub url_template: String,
}

impl Serialize for AssociationCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("associations", &self.associations)?;
        map.serialize_entry("total", &self.total)?;
        map.serialize_entry(&self.kind.url_template_key(), &self.url_template)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Option<String>,
    pub name: Option<String>,
    pub categories: Vec<String>,
    pub description: Option<String>,
}

impl From<RawSearchItem> for SearchResult {
    fn from(item: RawSearchItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            categories: item.category,
            description: item.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    pub id: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub rank: Option<String>,
    pub score: Option<Number>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub taxon: Taxon,
    pub id: Option<String>,
    pub label: Option<String>,
}

impl From<RawMatch> for SimilarityMatch {
    fn from(raw: RawMatch) -> Self {
        let taxon = raw
            .taxon
            .map(|taxon| Taxon {
                id: taxon.id,
                label: taxon.label,
            })
            .unwrap_or_default();
        Self {
            rank: raw.rank,
            score: raw.score,
            kind: raw.kind,
            taxon,
            id: raw.id,
            label: raw.label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResults {
    pub matches: Vec<SimilarityMatch>,
    pub max_max_ic: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationCount {
    pub label: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub id: String,
    pub categories: Vec<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub symbol: Option<String>,
    pub synonyms: Vec<String>,
    pub association_counts: Vec<AssociationCount>,
}

impl EntityDescriptor {
    /// Falls back to the requested id when upstream omits it.
    fn from_raw(requested: &Identifier, raw: RawEntity) -> Self {
        Self {
            id: raw.id.unwrap_or_else(|| requested.as_str().to_string()),
            categories: raw.category,
            name: raw.name,
            description: raw.description,
            symbol: raw.symbol,
            synonyms: raw.synonym,
            association_counts: raw
                .association_counts
                .into_iter()
                .map(|count| AssociationCount {
                    label: count.label,
                    count: count.count,
                })
                .collect(),
        }
    }
}

/// Request-scoped mappers over the upstream collaborators. Cheap to clone;
/// one instance is shared by every handler.
#[derive(Clone)]
pub struct App {
    monarch: Arc<dyn MonarchClient>,
    semsim: Arc<dyn SemsimClient>,
    publications: PublicationResolver,
    ui_url: String,
}

impl App {
    pub fn new(
        monarch: Arc<dyn MonarchClient>,
        semsim: Arc<dyn SemsimClient>,
        publications: PublicationResolver,
        ui_url: impl Into<String>,
    ) -> Self {
        Self {
            monarch,
            semsim,
            publications,
            ui_url: ui_url.into(),
        }
    }

    /// Wires the HTTP collaborators described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, BridgeError> {
        let monarch = Arc::new(MonarchHttpClient::new(settings)?);
        let semsim = Arc::new(SemsimHttpClient::new(settings)?);
        let isbn = Arc::new(OpenLibraryHttpClient::new(settings)?);
        let citations = Arc::new(PubmedHttpClient::new(settings)?);
        let mut publications = PublicationResolver::new(isbn, citations)
            .with_concurrency(settings.publication_concurrency);
        if !settings.resolve_publications {
            publications = publications.disabled();
        }
        Ok(Self::new(
            monarch,
            semsim,
            publications,
            settings.monarch_ui_url.clone(),
        ))
    }

    pub fn publications(&self) -> &PublicationResolver {
        &self.publications
    }

    pub async fn search_entity(
        &self,
        term: &str,
        category: &str,
        limit: u32,
        offset: u32,
    ) -> Result<SearchResults, BridgeError> {
        if term.trim().is_empty() {
            return Err(BridgeError::InvalidQuery("search term is empty".to_string()));
        }
        let query = SearchQuery {
            term: term.to_string(),
            category: category.to_string(),
            limit,
            offset,
        };
        let page = self.monarch.search(&query).await?;
        info!(term, category, results = page.items.len(), total = page.total, "search");
        Ok(SearchResults {
            results: page.items.into_iter().map(SearchResult::from).collect(),
            total: page.total,
        })
    }

    /// Fetches every category for `direction` (concurrently when merged),
    /// concatenates in category order and sums the upstream totals.
    pub async fn associations(
        &self,
        direction: Direction,
        anchor: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationCollection, BridgeError> {
        let pages = try_join_all(direction.categories().iter().map(|category| async move {
            let page = self
                .monarch
                .fetch_associations(*category, anchor, limit, offset)
                .await?;
            Ok::<_, BridgeError>((*category, page))
        }))
        .await?;

        let total: u64 = pages.iter().map(|(_, page)| page.total).sum();
        let pending = pages.into_iter().flat_map(|(category, page)| {
            page.items
                .into_iter()
                .map(move |item| self.build_association(direction, category, item))
        });
        let associations = join_all(pending).await;

        info!(
            %direction,
            anchor = anchor.as_str(),
            associations = associations.len(),
            total,
            "associations"
        );
        let kind = direction.result_kind();
        Ok(AssociationCollection {
            kind,
            associations,
            total,
            url_template: kind.url_template(&self.ui_url),
        })
    }

    pub async fn get_disease_gene_associations(
        &self,
        disease_id: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationCollection, BridgeError> {
        self.associations(Direction::DiseaseGenes, disease_id, limit, offset)
            .await
    }

    pub async fn get_gene_disease_associations(
        &self,
        gene_id: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationCollection, BridgeError> {
        self.associations(Direction::GeneDiseases, gene_id, limit, offset)
            .await
    }

    pub async fn get_disease_phenotype_associations(
        &self,
        disease_id: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationCollection, BridgeError> {
        self.associations(Direction::DiseasePhenotypes, disease_id, limit, offset)
            .await
    }

    pub async fn get_gene_phenotype_associations(
        &self,
        gene_id: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationCollection, BridgeError> {
        self.associations(Direction::GenePhenotypes, gene_id, limit, offset)
            .await
    }

    pub async fn get_phenotype_disease_associations(
        &self,
        phenotype_id: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationCollection, BridgeError> {
        self.associations(Direction::PhenotypeDiseases, phenotype_id, limit, offset)
            .await
    }

    pub async fn get_phenotype_gene_associations(
        &self,
        phenotype_id: &Identifier,
        limit: u32,
        offset: u32,
    ) -> Result<AssociationCollection, BridgeError> {
        self.associations(Direction::PhenotypeGenes, phenotype_id, limit, offset)
            .await
    }

    pub async fn search_phenotype_profiles(
        &self,
        ids: Vec<Identifier>,
        limit: u32,
    ) -> Result<SimilarityResults, BridgeError> {
        if ids.is_empty() {
            return Err(BridgeError::InvalidQuery(
                "at least one id is required".to_string(),
            ));
        }
        let query = SimilarityQuery::new(ids, limit);
        debug!(
            ids = query.ids.len(),
            is_feature_set = query.is_feature_set,
            "phenotype profile search"
        );
        let page = self.semsim.search(&query).await?;
        Ok(SimilarityResults {
            matches: page.matches.into_iter().map(SimilarityMatch::from).collect(),
            max_max_ic: page.metadata.and_then(|metadata| metadata.max_max_ic),
        })
    }

    /// One upstream call per id, issued concurrently. Output follows input
    /// order; any failing id fails the whole batch.
    pub async fn get_entities(
        &self,
        ids: &[Identifier],
    ) -> Result<Vec<EntityDescriptor>, BridgeError> {
        try_join_all(ids.iter().map(|id| async move {
            let raw = self.monarch.entity(id).await?;
            Ok::<_, BridgeError>(EntityDescriptor::from_raw(id, raw))
        }))
        .await
    }

    async fn build_association(
        &self,
        direction: Direction,
        category: AssociationCategory,
        item: RawAssociation,
    ) -> Association {
        let (id, label) = item.entity_at(direction.result_slot());
        let entity = NamedEntity {
            id: id.map(str::to_string),
            label: label.map(str::to_string),
        };
        let metadata = association_metadata(category, &item);
        let publications = self.publications.resolve_all(&item.publications).await;
        Association {
            id: item.id,
            kind: direction.result_kind(),
            entity,
            metadata,
            publications,
        }
    }
}

/// Relationship tag for gene/disease categories, qualifiers for phenotype ones.
pub fn association_metadata(
    category: AssociationCategory,
    item: &RawAssociation,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    if let Some(tag) = category.relationship() {
        metadata.insert("relationship".to_string(), Value::from(tag));
    }
    if category.carries_qualifiers() {
        metadata.insert(
            "frequency_qualifier".to_string(),
            item.frequency_qualifier.clone().map_or(Value::Null, Value::from),
        );
        metadata.insert(
            "onset_qualifier".to_string(),
            item.onset_qualifier.clone().map_or(Value::Null, Value::from),
        );
    }
    metadata
}
