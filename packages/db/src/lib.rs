//! SurrealDB integration for the job coordination system.
//!
//! This crate defines the [`VersionedStore`] contract the engine consumes and
//! provides [`DocumentRepository`], a SurrealDB-backed implementation with
//! revision-checked updates.
//!
//! # Features
//!
//! - `memory` (default): Use in-memory storage for testing
//! - `rocksdb`: Use RocksDB for persistent file-based storage

mod connection;
mod schema;
mod store;
pub mod repositories;

pub use connection::{Database, DbConfig, connect};
pub use repositories::DocumentRepository;
pub use schema::{DOCUMENT_TABLE, init_schema};
pub use store::{StoreError, VersionedStore};

/// Connect to the configured store and initialize its schema.
pub async fn init(config: &DbConfig) -> Result<DocumentRepository, StoreError> {
    DocumentRepository::connect(config).await
}
