//! Document repository: the SurrealDB-backed versioned store.

use job_core::{BaseDocument, DocId, Document, ProcessingState, Revision};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::connection::{DbConfig, Database, connect};
use crate::schema::{DOCUMENT_TABLE, init_schema};
use crate::store::{StoreError, VersionedStore};

/// Repository for versioned document persistence.
///
/// Every write replaces the record's `rev` field with a fresh token, and an
/// update only matches while `rev` still equals the token the caller read.
#[derive(Clone)]
pub struct DocumentRepository {
    db: Database,
}

/// Internal record type for SurrealDB.
///
/// The record id is the document id; the body never repeats it.
#[derive(Debug, Serialize, Deserialize)]
struct DocumentRecord<T> {
    rev: Revision,
    #[serde(flatten)]
    doc: T,
}

fn next_revision() -> Revision {
    Revision::new(Ulid::new().to_string())
}

fn is_conflict(err: &surrealdb::Error) -> bool {
    err.to_string().to_lowercase().contains("conflict")
}

fn is_already_exists(err: &surrealdb::Error) -> bool {
    err.to_string().to_lowercase().contains("already exists")
}

/// Concurrent commits touching the same record surface as a transaction
/// conflict from the engine rather than an empty `WHERE` match.
fn map_write_error(doc_id: &DocId, err: surrealdb::Error) -> StoreError {
    if is_conflict(&err) {
        StoreError::Conflict {
            doc_id: doc_id.clone(),
        }
    } else {
        StoreError::Connection(err)
    }
}

impl DocumentRepository {
    /// Connect using the given configuration and make sure the schema exists.
    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        let db = connect(config).await?;
        init_schema(&db).await?;
        Ok(Self { db })
    }

    /// Wrap an already connected database. The schema must exist.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Get the underlying connection.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Ids of all documents currently in the given processing state.
    ///
    /// Lets a supervisor find jobs stuck in `Processing` and re-drive them.
    pub async fn find_by_state(&self, state: ProcessingState) -> Result<Vec<DocId>, StoreError> {
        let mut response = self
            .db
            .query("SELECT VALUE meta::id(id) FROM type::table($table) WHERE processing_state = $state")
            .bind(("table", DOCUMENT_TABLE))
            .bind(("state", state))
            .await?;

        let ids: Vec<String> = response.take(0)?;

        Ok(ids.into_iter().map(DocId::from).collect())
    }

    async fn exists(&self, id: &DocId) -> Result<bool, StoreError> {
        let record: Option<DocumentRecord<BaseDocument>> =
            self.db.select((DOCUMENT_TABLE, id.to_string())).await?;
        Ok(record.is_some())
    }
}

impl VersionedStore for DocumentRepository {
    async fn retrieve<T: Document>(&self, id: &DocId) -> Result<T, StoreError> {
        let record: Option<DocumentRecord<T>> =
            self.db.select((DOCUMENT_TABLE, id.to_string())).await?;

        let record = record.ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut doc = record.doc;
        let header = doc.header_mut();
        header.id = Some(id.clone());
        header.revision = Some(record.rev);

        Ok(doc)
    }

    async fn insert<T: Document>(&self, doc: &mut T) -> Result<(), StoreError> {
        let id = doc.id().cloned().unwrap_or_else(DocId::generate);

        if self.exists(&id).await? {
            return Err(StoreError::AlreadyExists(id));
        }

        let rev = next_revision();
        let record = DocumentRecord {
            rev: rev.clone(),
            doc: doc.clone(),
        };

        // A concurrent insert of the same id can slip in after the check above;
        // it then shows up as a duplicate key or a commit conflict.
        let created: Option<DocumentRecord<BaseDocument>> = match self
            .db
            .create((DOCUMENT_TABLE, id.to_string()))
            .content(record)
            .await
        {
            Ok(created) => created,
            Err(e) if is_already_exists(&e) => return Err(StoreError::AlreadyExists(id)),
            Err(e) if is_conflict(&e) => {
                return Err(if self.exists(&id).await? {
                    StoreError::AlreadyExists(id)
                } else {
                    StoreError::Connection(e)
                });
            }
            Err(e) => return Err(StoreError::Connection(e)),
        };

        if created.is_none() {
            return Err(StoreError::Query(format!("Failed to create document {}", id)));
        }

        tracing::debug!(doc_id = %id, rev = %rev, doc_type = %doc.doc_type(), "document inserted");

        let header = doc.header_mut();
        header.id = Some(id);
        header.revision = Some(rev);

        Ok(())
    }

    async fn update<T: Document>(&self, doc: &T) -> Result<Revision, StoreError> {
        let id = doc.id().cloned().ok_or(StoreError::MissingId)?;
        let expected = doc.revision().cloned().ok_or(StoreError::MissingRevision)?;

        let rev = next_revision();
        let record = DocumentRecord {
            rev: rev.clone(),
            doc: doc.clone(),
        };

        let mut response = self
            .db
            .query(
                "UPDATE type::thing($table, $id) CONTENT $content WHERE rev = $expected RETURN AFTER",
            )
            .bind(("table", DOCUMENT_TABLE))
            .bind(("id", id.to_string()))
            .bind(("content", record))
            .bind(("expected", expected.to_string()))
            .await
            .map_err(|e| map_write_error(&id, e))?;

        let updated: Vec<DocumentRecord<BaseDocument>> =
            response.take(0).map_err(|e| map_write_error(&id, e))?;

        if !updated.is_empty() {
            tracing::debug!(doc_id = %id, from = %expected, to = %rev, "document updated");
            return Ok(rev);
        }

        // Nothing matched: either the revision moved on or the record is gone.
        if self.exists(&id).await? {
            Err(StoreError::Conflict { doc_id: id })
        } else {
            Err(StoreError::NotFound(id))
        }
    }
}
