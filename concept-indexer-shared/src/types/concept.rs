//! Upstream concept model.
//!
//! Producers emit either a simple concept (a single source record) or an
//! aggregate concept concording several source records under a preferred
//! UUID. The presence of a `prefUUID` field in the payload selects the
//! aggregate variant.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Key under `alternativeIdentifiers` that lists the concept's own UUIDs.
/// It is not an authority and is excluded from the derived authority list.
const UUIDS_IDENTIFIER_KEY: &str = "uuids";

/// A simple concept: one source record with a flat authority mapping.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ConceptModel {
    pub uuid: String,
    #[serde(rename = "type")]
    pub direct_type: String,
    #[serde(rename = "prefLabel")]
    pub pref_label: String,
    #[serde(default)]
    pub authority: Option<String>,
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    #[serde(rename = "alternativeIdentifiers", default)]
    pub alternative_identifiers: Option<BTreeMap<String, Value>>,
    #[serde(rename = "isDeprecated", default)]
    pub is_deprecated: bool,
    #[serde(rename = "scopeNote", default)]
    pub scope_note: Option<String>,
}

/// A role held within a membership.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MembershipRole {
    #[serde(rename = "membershipRoleUUID", default)]
    pub role_uuid: String,
    #[serde(rename = "inceptionDate", default)]
    pub inception_date: Option<String>,
    #[serde(rename = "terminationDate", default)]
    pub termination_date: Option<String>,
}

/// One source record concorded into an aggregate concept.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SourceConcept {
    pub uuid: String,
    #[serde(default)]
    pub authority: String,
}

/// A ranked NAICS industry classification.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize, PartialEq)]
pub struct NaicsClassification {
    pub uuid: String,
    pub rank: i64,
}

/// An aggregate concept: several source records concorded under a preferred
/// UUID, with authorities collected from the source representations.
///
/// `organisationUUID` and `personUUID` are declared singular upstream but are
/// accepted as string-or-array here so that the converter can reject payloads
/// carrying more than one value instead of silently picking the first.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AggregateConceptModel {
    #[serde(rename = "prefUUID")]
    pub pref_uuid: String,
    #[serde(rename = "type")]
    pub direct_type: String,
    #[serde(rename = "prefLabel")]
    pub pref_label: String,
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    #[serde(rename = "scopeNote", default)]
    pub scope_note: Option<String>,
    #[serde(rename = "membershipRoles", default)]
    pub membership_roles: Vec<MembershipRole>,
    #[serde(rename = "organisationUUID", default, deserialize_with = "one_or_many")]
    pub organisation_uuids: Vec<String>,
    #[serde(rename = "personUUID", default, deserialize_with = "one_or_many")]
    pub person_uuids: Vec<String>,
    #[serde(rename = "countryCode", default)]
    pub country_code: Option<String>,
    #[serde(rename = "countryOfIncorporation", default)]
    pub country_of_incorporation: Option<String>,
    #[serde(rename = "isDeprecated", default)]
    pub is_deprecated: bool,
    #[serde(rename = "sourceRepresentations", default)]
    pub source_representations: Vec<SourceConcept>,
    #[serde(rename = "naicsIndustryClassifications", default)]
    pub naics: Vec<NaicsClassification>,
}

/// Accepts a JSON string or an array of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// A concept record, either variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Concept {
    Simple(ConceptModel),
    Aggregate(AggregateConceptModel),
}

impl Concept {
    /// Deserialize a concept payload, selecting the aggregate variant when a
    /// `prefUUID` field is present.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        if value.get("prefUUID").is_some() {
            Ok(Concept::Aggregate(serde_json::from_value(value)?))
        } else {
            Ok(Concept::Simple(serde_json::from_value(value)?))
        }
    }

    /// The identifier keying the live index document.
    pub fn preferred_uuid(&self) -> &str {
        match self {
            Concept::Simple(concept) => &concept.uuid,
            Concept::Aggregate(concept) => &concept.pref_uuid,
        }
    }

    /// Source UUIDs swallowed by this concept, excluding the preferred UUID.
    /// Always empty for the simple variant.
    pub fn concorded_uuids(&self) -> Vec<String> {
        match self {
            Concept::Simple(_) => Vec::new(),
            Concept::Aggregate(concept) => concept
                .source_representations
                .iter()
                .filter(|source| source.uuid != concept.pref_uuid)
                .map(|source| source.uuid.clone())
                .collect(),
        }
    }

    /// The concept's direct type, e.g. `Brand` or `PublicCompany`.
    pub fn direct_type(&self) -> &str {
        match self {
            Concept::Simple(concept) => &concept.direct_type,
            Concept::Aggregate(concept) => &concept.direct_type,
        }
    }

    /// The concept's preferred label.
    pub fn pref_label(&self) -> &str {
        match self {
            Concept::Simple(concept) => &concept.pref_label,
            Concept::Aggregate(concept) => &concept.pref_label,
        }
    }

    /// All authorities this concept is identified by.
    pub fn authorities(&self) -> Vec<String> {
        match self {
            Concept::Simple(concept) => concept.authorities(),
            Concept::Aggregate(concept) => concept
                .source_representations
                .iter()
                .map(|source| source.authority.clone())
                .collect(),
        }
    }
}

impl ConceptModel {
    /// Authorities derived from `alternativeIdentifiers`, excluding the
    /// reserved `uuids` key. Falls back to the scalar `authority` field when
    /// the mapping is absent.
    pub fn authorities(&self) -> Vec<String> {
        match &self.alternative_identifiers {
            None => self.authority.iter().cloned().collect(),
            Some(identifiers) => identifiers
                .keys()
                .filter(|key| key.as_str() != UUIDS_IDENTIFIER_KEY)
                .cloned()
                .collect(),
        }
    }
}
