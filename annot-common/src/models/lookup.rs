//! Lookup tables: conceptual domains, parts of speech, domain relations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum;

/// Which side of a metaphor a domain is used on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    Source,
    Target,
}

text_enum!(DomainType {
    Source => "source",
    Target => "target",
});

/// Conceptual domain, unique on `(name, type)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub domain_type: DomainType,
}

/// Domain creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewDomain {
    pub name: String,
    #[serde(rename = "type")]
    pub domain_type: DomainType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub domain_type: Option<DomainType>,
}

/// Part of speech, unique on `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub id: Uuid,
    pub name: String,
}

/// Lexical relation between two domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    Hypernym,
    Hyponym,
    CoHyponym,
    Meronym,
    Holonym,
    Syntagmatic,
}

text_enum!(RelationType {
    Hypernym => "hypernym",
    Hyponym => "hyponym",
    CoHyponym => "co-hyponym",
    Meronym => "meronym",
    Holonym => "holonym",
    Syntagmatic => "syntagmatic",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRelation {
    pub id: Uuid,
    pub domain_a: Uuid,
    pub domain_b: Uuid,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDomainRelation {
    pub domain_a: Uuid,
    pub domain_b: Uuid,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DomainRelationPatch {
    #[serde(default)]
    pub domain_a: Option<Uuid>,
    #[serde(default)]
    pub domain_b: Option<Uuid>,
    #[serde(default)]
    pub relation_type: Option<RelationType>,
}
