//! Database schema definitions using SurrealQL.

use crate::{Database, StoreError};

/// Table holding every versioned document, whatever its type tag.
pub const DOCUMENT_TABLE: &str = "document";

/// Initialize the database schema.
pub async fn init_schema(db: &Database) -> Result<(), StoreError> {
    tracing::info!("Initializing document schema...");

    db.query(DOCUMENT_SCHEMA).await?.check()?;

    tracing::info!("Document schema initialized");

    Ok(())
}

/// Document table schema.
///
/// Schemaless because job kinds carry their own fields; only the fields the
/// core relies on are indexed.
const DOCUMENT_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS document SCHEMALESS;

-- Indexes for dispatch and supervision lookups
DEFINE INDEX IF NOT EXISTS document_type ON document FIELDS `type`;
DEFINE INDEX IF NOT EXISTS document_state ON document FIELDS processing_state;
"#;
