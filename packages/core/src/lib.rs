//! Core domain types for the job coordination system.
//!
//! This crate contains shared types used across all packages:
//! - Document, DocHeader and the id/revision/type newtypes
//! - ProcessingState and the JobDocument contract
//! - Concrete job kinds (ClassifyJob, Dataset)
//! - Events for observing job runs

mod classify;
mod dataset;
mod document;
mod events;
mod job;

pub use classify::{ClassifyJob, ClassifyResults};
pub use dataset::{Dataset, DatasetSplit};
pub use document::{BaseDocument, DocHeader, DocId, DocType, Document, Revision};
pub use events::JobEvent;
pub use job::{JobDescriptor, JobDocument, JobExecutionError, ProcessingState, Transition};
