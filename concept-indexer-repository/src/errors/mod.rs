//! Error types for document store operations.

mod store_error;

pub use store_error::StoreError;
