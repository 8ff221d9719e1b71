//! Index document variants.
//!
//! Documents are written to the search cluster as JSON; field names here
//! follow the index mapping (camelCase), so these types are the wire
//! contract. The `metrics` sub-document is owned by an out-of-band pipeline
//! and must survive write-path overwrites, which is why the patch payloads
//! exist.

use serde::{Deserialize, Serialize};

use super::concept::NaicsClassification;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Externally maintained annotation counters co-located on the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConceptMetrics {
    #[serde(rename = "annotationsCount")]
    pub annotations_count: i64,
    #[serde(rename = "prevWeekAnnotationsCount")]
    pub prev_week_annotations_count: i64,
}

/// The common concept document shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConceptDocument {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub concept_type: Option<String>,
    #[serde(rename = "apiUrl")]
    pub api_url: String,
    #[serde(rename = "prefLabel")]
    pub pref_label: String,
    pub types: Vec<String>,
    pub authorities: Vec<String>,
    #[serde(rename = "directType")]
    pub direct_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
    #[serde(rename = "publishReference")]
    pub publish_reference: String,
    // stored only when true
    #[serde(rename = "isDeprecated", skip_serializing_if = "is_false")]
    pub is_deprecated: bool,
    #[serde(rename = "scopeNote", skip_serializing_if = "Option::is_none")]
    pub scope_note: Option<String>,
    #[serde(rename = "countryCode", skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(rename = "countryOfIncorporation", skip_serializing_if = "Option::is_none")]
    pub country_of_incorporation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ConceptMetrics>,
    #[serde(rename = "NAICS")]
    pub naics: Vec<NaicsClassification>,
}

/// A person document: concept fields plus the FT-author flag.
///
/// The flag is the string `"true"` or `"false"`, matching the index mapping;
/// it is omitted entirely when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersonDocument {
    #[serde(flatten)]
    pub concept: ConceptDocument,
    #[serde(rename = "isFTAuthor", skip_serializing_if = "String::is_empty")]
    pub is_ft_author: String,
}

/// A membership document. Memberships never carry concept fields directly;
/// their effect on the index is routed through the member's person document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MembershipDocument {
    pub id: String,
    #[serde(rename = "personId")]
    pub person_id: String,
    #[serde(rename = "organisationId")]
    pub organisation_id: String,
    pub memberships: Vec<String>,
}

/// A document ready to be written, discriminated by concept type.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum IndexDocument {
    Concept(ConceptDocument),
    Person(PersonDocument),
    Membership(MembershipDocument),
}

/// Partial-update payload restoring the metrics sub-document.
///
/// `metrics` is serialized even when absent (as `null`) so that a restore of
/// "no metrics" is an explicit write rather than a skipped field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConceptPatch {
    pub metrics: Option<ConceptMetrics>,
}

/// Partial-update payload for person documents, restoring metrics and the
/// FT-author flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonPatch {
    pub metrics: Option<ConceptMetrics>,
    #[serde(rename = "isFTAuthor")]
    pub is_ft_author: String,
}

/// A partial-update payload, discriminated by the target document shape.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DocumentPatch {
    Concept(ConceptPatch),
    Person(PersonPatch),
}

/// One item emitted by the all-ids stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdTypePair {
    #[serde(rename = "uuid")]
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub concept_type: Option<String>,
}
