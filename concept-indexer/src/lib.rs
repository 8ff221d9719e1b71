//! # Concept Indexer
//!
//! Write-path bridge between upstream concept records and the full-text
//! search index backing the public read APIs. Incoming concepts are
//! converted into index documents, written through a stateful indexing
//! engine, and the documents of source identifiers swallowed by an
//! aggregate record are garbage-collected.

pub mod config;
pub mod connection;
pub mod converter;
pub mod engine;
pub mod errors;
pub mod health;
pub mod resources;

pub use config::AppConfig;
pub use engine::{BulkConfig, IndexEngine, WriteOutcome};
pub use errors::EngineError;
