//! Repository implementations for database operations.

mod document_repo;

pub use document_repo::DocumentRepository;
