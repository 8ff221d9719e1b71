//! Concept-to-document conversion.
//!
//! Pure mapping from an upstream concept record to the index document
//! written to the search cluster. The engine applies its type-specific write
//! semantics on top; conversion itself never touches the network.

pub mod ontology;

use chrono::{SecondsFormat, Utc};
use concept_indexer_shared::{
    AggregateConceptModel, Concept, ConceptDocument, ConceptModel, IndexDocument,
    MembershipDocument, PersonDocument, CONCEPT_TYPE_MEMBERSHIPS, CONCEPT_TYPE_ORGANISATIONS,
    CONCEPT_TYPE_PEOPLE,
};
use thiserror::Error;
use tracing::warn;

/// Direct type whose organisations carry country fields.
const DIRECT_TYPE_PUBLIC_COMPANY: &str = "PublicCompany";

/// Default author flag for person documents converted from aggregate input;
/// authorship is controlled by membership writes.
const DEFAULT_IS_FT_AUTHOR: &str = "false";

/// Conversion failures; surfaced to writers as client errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// The concept is missing required fields or uses an unknown type.
    #[error("invalid or incomplete concept model: {0}")]
    InvalidModel(String),

    /// A field declared singular carried more than one value.
    #[error("ambiguous concept model: {0}")]
    Ambiguous(String),
}

/// Convert a concept record into the index document for its concept type.
pub fn convert_concept(
    concept: &Concept,
    concept_type: &str,
    publish_ref: &str,
    api_host: &str,
) -> Result<IndexDocument, ConvertError> {
    if concept.direct_type().is_empty() || concept.pref_label().is_empty() {
        return Err(ConvertError::InvalidModel(
            "type and prefLabel are required".to_string(),
        ));
    }

    match concept {
        Concept::Simple(model) => convert_simple(model, concept_type, publish_ref, api_host),
        Concept::Aggregate(model) => convert_aggregate(model, concept_type, publish_ref, api_host),
    }
}

fn convert_simple(
    concept: &ConceptModel,
    concept_type: &str,
    publish_ref: &str,
    api_host: &str,
) -> Result<IndexDocument, ConvertError> {
    let base = new_concept_document(DocumentParts {
        uuid: &concept.uuid,
        concept_type,
        direct_type: &concept.direct_type,
        pref_label: &concept.pref_label,
        publish_ref,
        api_host,
        scope_note: concept.scope_note.clone(),
        aliases: concept.aliases.clone(),
        authorities: concept.authorities(),
        is_deprecated: concept.is_deprecated,
    })?;

    // person concepts normally arrive as aggregates; a simple person is
    // wrapped without an author flag
    if concept_type == CONCEPT_TYPE_PEOPLE {
        Ok(IndexDocument::Person(PersonDocument {
            concept: base,
            is_ft_author: String::new(),
        }))
    } else {
        Ok(IndexDocument::Concept(base))
    }
}

fn convert_aggregate(
    concept: &AggregateConceptModel,
    concept_type: &str,
    publish_ref: &str,
    api_host: &str,
) -> Result<IndexDocument, ConvertError> {
    if concept_type == CONCEPT_TYPE_MEMBERSHIPS {
        return convert_membership(concept);
    }

    let authorities = concept
        .source_representations
        .iter()
        .map(|source| source.authority.clone())
        .collect();

    let mut base = new_concept_document(DocumentParts {
        uuid: &concept.pref_uuid,
        concept_type,
        direct_type: &concept.direct_type,
        pref_label: &concept.pref_label,
        publish_ref,
        api_host,
        scope_note: concept.scope_note.clone(),
        aliases: concept.aliases.clone(),
        authorities,
        is_deprecated: concept.is_deprecated,
    })?;

    let mut naics = concept.naics.clone();
    naics.sort_by_key(|classification| classification.rank);
    base.naics = naics;

    match concept_type {
        CONCEPT_TYPE_PEOPLE => Ok(IndexDocument::Person(PersonDocument {
            concept: base,
            is_ft_author: DEFAULT_IS_FT_AUTHOR.to_string(),
        })),
        CONCEPT_TYPE_ORGANISATIONS => {
            if concept.direct_type == DIRECT_TYPE_PUBLIC_COMPANY {
                base.country_code = concept.country_code.clone();
                base.country_of_incorporation = concept.country_of_incorporation.clone();
            }
            Ok(IndexDocument::Concept(base))
        }
        _ => Ok(IndexDocument::Concept(base)),
    }
}

/// Memberships carry no concept fields of their own; only the identifiers
/// the engine routes on.
fn convert_membership(concept: &AggregateConceptModel) -> Result<IndexDocument, ConvertError> {
    let organisation_id = singular(&concept.organisation_uuids, "organisationUUID")?;
    let person_id = singular(&concept.person_uuids, "personUUID")?;

    Ok(IndexDocument::Membership(MembershipDocument {
        id: concept.pref_uuid.clone(),
        person_id,
        organisation_id,
        memberships: concept
            .membership_roles
            .iter()
            .map(|role| role.role_uuid.clone())
            .collect(),
    }))
}

fn singular(values: &[String], field: &str) -> Result<String, ConvertError> {
    match values {
        [] => Err(ConvertError::InvalidModel(format!(
            "membership is missing {field}"
        ))),
        [value] => Ok(value.clone()),
        _ => Err(ConvertError::Ambiguous(format!(
            "membership carries {} values for {field}",
            values.len()
        ))),
    }
}

struct DocumentParts<'a> {
    uuid: &'a str,
    concept_type: &'a str,
    direct_type: &'a str,
    pref_label: &'a str,
    publish_ref: &'a str,
    api_host: &'a str,
    scope_note: Option<String>,
    aliases: Option<Vec<String>>,
    authorities: Vec<String>,
    is_deprecated: bool,
}

fn new_concept_document(parts: DocumentParts<'_>) -> Result<ConceptDocument, ConvertError> {
    let types = ontology::full_type_hierarchy(parts.direct_type).ok_or_else(|| {
        ConvertError::InvalidModel(format!("unknown concept type {:?}", parts.direct_type))
    })?;
    let api_url = ontology::api_url(parts.uuid, parts.direct_type, parts.api_host)
        .ok_or_else(|| {
            ConvertError::InvalidModel(format!("no API URL mapping for {:?}", parts.direct_type))
        })?;

    let direct_type_uris = ontology::type_uris(parts.direct_type);
    let direct_type = if direct_type_uris.len() == 1 {
        direct_type_uris.into_iter().next().unwrap_or_default()
    } else {
        warn!(
            concept_type = parts.concept_type,
            pref_uuid = parts.uuid,
            type_uris = ?direct_type_uris,
            "exactly one direct type is expected during type mapping"
        );
        String::new()
    };

    Ok(ConceptDocument {
        id: ontology::thing_id_url(parts.uuid, parts.api_host),
        concept_type: Some(parts.concept_type.to_string()),
        api_url,
        pref_label: parts.pref_label.to_string(),
        types,
        authorities: parts.authorities,
        direct_type,
        aliases: parts.aliases,
        last_modified: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        publish_reference: parts.publish_ref.to_string(),
        is_deprecated: parts.is_deprecated,
        scope_note: parts.scope_note,
        ..Default::default()
    })
}
