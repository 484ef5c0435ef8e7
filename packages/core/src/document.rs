//! Versioned document primitives shared by every stored entity.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Store-assigned document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier, using ULID for chronological sorting.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque revision token used for optimistic concurrency.
///
/// Only a store produces these. Application code carries them from a read to
/// the next write and never builds or compares them for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type tag naming the concrete kind of a stored document.
///
/// The tag is authoritative for dispatch and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocType(Cow<'static, str>);

impl DocType {
    pub const CLASSIFY_JOB: DocType = DocType(Cow::Borrowed("classify-job"));
    pub const DATASET: DocType = DocType(Cow::Borrowed("dataset"));

    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields every document carries.
///
/// `id` and `revision` belong to the store: they are filled in on read and
/// insert and are never serialized into the document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocHeader {
    #[serde(skip)]
    pub id: Option<DocId>,
    #[serde(skip)]
    pub revision: Option<Revision>,
    #[serde(rename = "type")]
    pub doc_type: DocType,
}

impl DocHeader {
    /// Header for a document that has not been stored yet.
    pub fn new(doc_type: DocType) -> Self {
        Self {
            id: None,
            revision: None,
            doc_type,
        }
    }
}

/// A versioned, store-persisted record.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn header(&self) -> &DocHeader;

    fn header_mut(&mut self) -> &mut DocHeader;

    fn id(&self) -> Option<&DocId> {
        self.header().id.as_ref()
    }

    fn revision(&self) -> Option<&Revision> {
        self.header().revision.as_ref()
    }

    fn doc_type(&self) -> &DocType {
        &self.header().doc_type
    }
}

/// A document viewed only through its header.
///
/// Used to learn the type tag of an arbitrary document before committing to a
/// concrete shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseDocument {
    #[serde(flatten)]
    pub header: DocHeader,
}

impl Document for BaseDocument {
    fn header(&self) -> &DocHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut DocHeader {
        &mut self.header
    }
}
