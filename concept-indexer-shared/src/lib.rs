//! # Concept Indexer Shared
//!
//! Shared types for the concept indexer: the upstream concept model
//! (simple and aggregate variants) and the index document variants written
//! to the search cluster, together with the partial-update payloads used to
//! preserve server-maintained fields across overwrites.

pub mod types;

pub use types::concept::{
    AggregateConceptModel, Concept, ConceptModel, MembershipRole, NaicsClassification,
    SourceConcept,
};
pub use types::document::{
    ConceptDocument, ConceptMetrics, ConceptPatch, DocumentPatch, IdTypePair, IndexDocument,
    MembershipDocument, PersonDocument, PersonPatch,
};
pub use types::{CONCEPT_TYPE_MEMBERSHIPS, CONCEPT_TYPE_ORGANISATIONS, CONCEPT_TYPE_PEOPLE};
