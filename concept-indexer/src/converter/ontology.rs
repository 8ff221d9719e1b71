//! Type ontology tables.
//!
//! Maps a concept's direct type to its full type hierarchy, its canonical
//! type URI, and the public API path used when building `apiUrl`.

const THING: &str = "http://www.ft.com/ontology/core/Thing";
const CONCEPT: &str = "http://www.ft.com/ontology/concept/Concept";
const CLASSIFICATION: &str = "http://www.ft.com/ontology/classification/Classification";
const PERSON: &str = "http://www.ft.com/ontology/person/Person";
const ORGANISATION: &str = "http://www.ft.com/ontology/organisation/Organisation";
const COMPANY: &str = "http://www.ft.com/ontology/company/Company";
const PUBLIC_COMPANY: &str = "http://www.ft.com/ontology/company/PublicCompany";
const PRIVATE_COMPANY: &str = "http://www.ft.com/ontology/company/PrivateCompany";
const BRAND: &str = "http://www.ft.com/ontology/product/Brand";
const GENRE: &str = "http://www.ft.com/ontology/Genre";
const TOPIC: &str = "http://www.ft.com/ontology/Topic";
const SECTION: &str = "http://www.ft.com/ontology/Section";
const SUBJECT: &str = "http://www.ft.com/ontology/Subject";
const LOCATION: &str = "http://www.ft.com/ontology/Location";
const ALPHAVILLE_SERIES: &str = "http://www.ft.com/ontology/AlphavilleSeries";
const SPECIAL_REPORT: &str = "http://www.ft.com/ontology/SpecialReport";
const MEMBERSHIP: &str = "http://www.ft.com/ontology/organisation/Membership";
const MEMBERSHIP_ROLE: &str = "http://www.ft.com/ontology/MembershipRole";

/// Full type hierarchy per direct type, root first.
static TYPE_HIERARCHIES: &[(&str, &[&str])] = &[
    ("Thing", &[THING]),
    ("Concept", &[THING, CONCEPT]),
    ("Classification", &[THING, CONCEPT, CLASSIFICATION]),
    ("Person", &[THING, CONCEPT, PERSON]),
    ("Organisation", &[THING, CONCEPT, ORGANISATION]),
    ("Company", &[THING, CONCEPT, ORGANISATION, COMPANY]),
    ("PublicCompany", &[THING, CONCEPT, ORGANISATION, COMPANY, PUBLIC_COMPANY]),
    ("PrivateCompany", &[THING, CONCEPT, ORGANISATION, COMPANY, PRIVATE_COMPANY]),
    ("Brand", &[THING, CONCEPT, CLASSIFICATION, BRAND]),
    ("Genre", &[THING, CONCEPT, CLASSIFICATION, GENRE]),
    ("Topic", &[THING, CONCEPT, TOPIC]),
    ("Section", &[THING, CONCEPT, CLASSIFICATION, SECTION]),
    ("Subject", &[THING, CONCEPT, CLASSIFICATION, SUBJECT]),
    ("Location", &[THING, CONCEPT, LOCATION]),
    ("AlphavilleSeries", &[THING, CONCEPT, CLASSIFICATION, ALPHAVILLE_SERIES]),
    ("SpecialReport", &[THING, CONCEPT, CLASSIFICATION, SPECIAL_REPORT]),
    ("Membership", &[THING, CONCEPT, MEMBERSHIP]),
    ("MembershipRole", &[THING, CONCEPT, MEMBERSHIP_ROLE]),
];

/// The full type hierarchy for a direct type, or `None` when the type is
/// unknown to the ontology.
pub fn full_type_hierarchy(direct_type: &str) -> Option<Vec<String>> {
    TYPE_HIERARCHIES
        .iter()
        .find(|(name, _)| *name == direct_type)
        .map(|(_, hierarchy)| hierarchy.iter().map(|uri| uri.to_string()).collect())
}

/// Canonical URIs for a direct type. The write path expects exactly one.
pub fn type_uris(direct_type: &str) -> Vec<String> {
    TYPE_HIERARCHIES
        .iter()
        .find(|(name, _)| *name == direct_type)
        .and_then(|(_, hierarchy)| hierarchy.last())
        .map(|uri| vec![uri.to_string()])
        .unwrap_or_default()
}

/// The public API path segment for a direct type.
fn api_path(direct_type: &str) -> Option<&'static str> {
    match direct_type {
        "Person" => Some("people"),
        "Organisation" | "Company" | "PublicCompany" | "PrivateCompany" => Some("organisations"),
        "Brand" => Some("brands"),
        known if full_type_hierarchy(known).is_some() => Some("things"),
        _ => None,
    }
}

/// The public API URL for a concept, or `None` when the direct type is
/// unknown.
pub fn api_url(uuid: &str, direct_type: &str, api_host: &str) -> Option<String> {
    api_path(direct_type).map(|path| format!("{api_host}/{path}/{uuid}"))
}

/// The canonical thing identifier for a concept.
pub fn thing_id_url(uuid: &str, api_host: &str) -> String {
    format!("{api_host}/things/{uuid}")
}
