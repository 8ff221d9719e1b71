//! Type definitions shared across the indexer crates.

pub mod concept;
pub mod document;

/// Concept type for people; people documents carry the FT-author flag.
pub const CONCEPT_TYPE_PEOPLE: &str = "people";

/// Concept type for memberships; membership writes are rerouted to the
/// member's person document.
pub const CONCEPT_TYPE_MEMBERSHIPS: &str = "memberships";

/// Concept type for organisations; public companies carry country fields.
pub const CONCEPT_TYPE_ORGANISATIONS: &str = "organisations";
