use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Namespace prefix carried by phenotype identifiers (`HP:0002721`).
pub const PHENOTYPE_PREFIX: &str = "HP:";

/// A CURIE-style identifier such as `MONDO:0009061`. Opaque apart from
/// prefix inspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace before the first `:`, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Local code after the first `:`, or the whole id when unprefixed.
    pub fn local_code(&self) -> &str {
        self.0
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.0)
    }

    pub fn is_phenotype(&self) -> bool {
        self.0.starts_with(PHENOTYPE_PREFIX)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = BridgeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty()
            || trimmed.chars().any(char::is_whitespace)
            || matches!(trimmed, "." | "..")
        {
            return Err(BridgeError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Gene,
    Disease,
    Phenotype,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Gene => "gene",
            EntityKind::Disease => "disease",
            EntityKind::Phenotype => "phenotype",
        }
    }

    /// Key under which a collection publishes its UI link template.
    pub fn url_template_key(&self) -> String {
        format!("{}_url_template", self.as_str())
    }

    /// Placeholder substituted with the result entity id by clients.
    pub fn placeholder(&self) -> String {
        format!("{{{}_id}}", self.as_str())
    }

    pub fn url_template(&self, ui_base: &str) -> String {
        format!("{}/{}/{}", ui_base, self.as_str(), self.placeholder())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upstream relationship-type tags accepted by `/association/all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationCategory {
    CausalGeneToDisease,
    CorrelatedGeneToDisease,
    DiseaseToPhenotypicFeature,
    GeneToPhenotypicFeature,
}

impl AssociationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationCategory::CausalGeneToDisease => "biolink:CausalGeneToDiseaseAssociation",
            AssociationCategory::CorrelatedGeneToDisease => {
                "biolink:CorrelatedGeneToDiseaseAssociation"
            }
            AssociationCategory::DiseaseToPhenotypicFeature => {
                "biolink:DiseaseToPhenotypicFeatureAssociation"
            }
            AssociationCategory::GeneToPhenotypicFeature => {
                "biolink:GeneToPhenotypicFeatureAssociation"
            }
        }
    }

    /// Synthesized relationship tag for gene/disease categories.
    pub fn relationship(&self) -> Option<&'static str> {
        match self {
            AssociationCategory::CausalGeneToDisease => Some("causal"),
            AssociationCategory::CorrelatedGeneToDisease => Some("correlated"),
            _ => None,
        }
    }

    pub fn carries_qualifiers(&self) -> bool {
        matches!(
            self,
            AssociationCategory::DiseaseToPhenotypicFeature
                | AssociationCategory::GeneToPhenotypicFeature
        )
    }
}

impl fmt::Display for AssociationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position inside an upstream subject/predicate/object triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Subject,
    Object,
}

impl Slot {
    pub fn opposite(&self) -> Slot {
        match self {
            Slot::Subject => Slot::Object,
            Slot::Object => Slot::Subject,
        }
    }
}

const GENE_DISEASE: &[AssociationCategory] = &[
    AssociationCategory::CausalGeneToDisease,
    AssociationCategory::CorrelatedGeneToDisease,
];
const DISEASE_PHENOTYPE: &[AssociationCategory] =
    &[AssociationCategory::DiseaseToPhenotypicFeature];
const GENE_PHENOTYPE: &[AssociationCategory] = &[AssociationCategory::GeneToPhenotypicFeature];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Direction {
    DiseaseGenes,
    GeneDiseases,
    DiseasePhenotypes,
    GenePhenotypes,
    PhenotypeDiseases,
    PhenotypeGenes,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::DiseaseGenes,
        Direction::GeneDiseases,
        Direction::DiseasePhenotypes,
        Direction::GenePhenotypes,
        Direction::PhenotypeDiseases,
        Direction::PhenotypeGenes,
    ];

    /// Upstream categories queried, in concatenation order.
    pub fn categories(&self) -> &'static [AssociationCategory] {
        match self {
            Direction::DiseaseGenes | Direction::GeneDiseases => GENE_DISEASE,
            Direction::DiseasePhenotypes | Direction::PhenotypeDiseases => DISEASE_PHENOTYPE,
            Direction::GenePhenotypes | Direction::PhenotypeGenes => GENE_PHENOTYPE,
        }
    }

    /// Triple slot holding the caller-supplied id.
    pub fn anchor_slot(&self) -> Slot {
        match self {
            Direction::GeneDiseases | Direction::DiseasePhenotypes | Direction::GenePhenotypes => {
                Slot::Subject
            }
            Direction::DiseaseGenes | Direction::PhenotypeDiseases | Direction::PhenotypeGenes => {
                Slot::Object
            }
        }
    }

    pub fn result_slot(&self) -> Slot {
        self.anchor_slot().opposite()
    }

    pub fn anchor_kind(&self) -> EntityKind {
        match self {
            Direction::DiseaseGenes | Direction::DiseasePhenotypes => EntityKind::Disease,
            Direction::GeneDiseases | Direction::GenePhenotypes => EntityKind::Gene,
            Direction::PhenotypeDiseases | Direction::PhenotypeGenes => EntityKind::Phenotype,
        }
    }

    pub fn result_kind(&self) -> EntityKind {
        match self {
            Direction::GeneDiseases | Direction::PhenotypeDiseases => EntityKind::Disease,
            Direction::DiseaseGenes | Direction::PhenotypeGenes => EntityKind::Gene,
            Direction::DiseasePhenotypes | Direction::GenePhenotypes => EntityKind::Phenotype,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.categories().len() > 1
    }

    /// Route path, e.g. `/disease-genes`.
    pub fn path(&self) -> &'static str {
        match self {
            Direction::DiseaseGenes => "/disease-genes",
            Direction::GeneDiseases => "/gene-diseases",
            Direction::DiseasePhenotypes => "/disease-phenotypes",
            Direction::GenePhenotypes => "/gene-phenotypes",
            Direction::PhenotypeDiseases => "/phenotype-diseases",
            Direction::PhenotypeGenes => "/phenotype-genes",
        }
    }

    /// Name of the query parameter carrying the anchor id.
    pub fn anchor_param(&self) -> &'static str {
        match self.anchor_kind() {
            EntityKind::Gene => "gene_id",
            EntityKind::Disease => "disease_id",
            EntityKind::Phenotype => "phenotype_id",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().trim_start_matches('/'))
    }
}
