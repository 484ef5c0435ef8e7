use db::{DbConfig, DocumentRepository, StoreError};

/// Each `mem://` connection opens its own datastore, so tests never share state.
pub async fn memory_repository() -> Result<DocumentRepository, StoreError> {
    db::init(&DbConfig::memory().with_namespace("test")).await
}
