//! Storage layer
//!
//! SQLite schema and typed storage errors. The `Store` facade in
//! `crate::store` builds on both.

pub mod error;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
