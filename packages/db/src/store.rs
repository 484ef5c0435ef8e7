//! The versioned store contract consumed by the job engine.

use std::future::Future;

use job_core::{DocId, Document, Revision};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The presented revision is no longer the document's current one.
    #[error("Revision conflict on document {doc_id}")]
    Conflict { doc_id: DocId },
    #[error("Document not found: {0}")]
    NotFound(DocId),
    #[error("Document already exists: {0}")]
    AlreadyExists(DocId),
    #[error("Document has no revision - it was never read from the store")]
    MissingRevision,
    #[error("Document has no id - it was never inserted")]
    MissingId,
    #[error("Connection error: {0}")]
    Connection(#[from] surrealdb::Error),
    #[error("Query error: {0}")]
    Query(String),
}

impl StoreError {
    /// Check if the error is a revision conflict that a fresh read may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Single-document compare-and-swap storage.
///
/// Every read returns the document's current revision in its header and every
/// write must present the revision it last read. No guarantee spans more
/// than one document.
pub trait VersionedStore: Clone + Send + Sync + 'static {
    /// Load a document with its id and current revision filled in.
    fn retrieve<T: Document>(
        &self,
        id: &DocId,
    ) -> impl Future<Output = Result<T, StoreError>> + Send;

    /// Store a new document, assigning an id (unless preset) and its first
    /// revision, both written back into `doc`.
    fn insert<T: Document>(
        &self,
        doc: &mut T,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace a document if its revision is still current, returning the new
    /// revision. Fails with [`StoreError::Conflict`] otherwise.
    fn update<T: Document>(
        &self,
        doc: &T,
    ) -> impl Future<Output = Result<Revision, StoreError>> + Send;
}
