//! Abstract interfaces over the search cluster.

mod document_store;

pub use document_store::DocumentStore;
