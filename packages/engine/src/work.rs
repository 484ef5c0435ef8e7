//! Pluggable domain work for each job kind.

use std::future::Future;
use std::pin::Pin;

use job_core::{JobDocument, JobExecutionError};
use tokio_util::sync::CancellationToken;

/// Future type for async job work.
pub type WorkFuture<O> = Pin<Box<dyn Future<Output = Result<O, JobExecutionError>> + Send>>;

/// Trait for the long-running part of a job.
///
/// Implement this to define what a job kind actually does between being
/// admitted and being finished. The engine owns every state transition; the
/// work only produces the kind's output or an error.
pub trait JobWork<D: JobDocument>: Send + Sync + 'static {
    /// Do the work for `doc`. `cancel` fires when the run is being cancelled.
    fn execute(&self, doc: &D, cancel: CancellationToken) -> WorkFuture<D::Output>;
}

/// A simple function-based job work.
pub struct FnWork<F> {
    work: F,
}

impl<F> FnWork<F> {
    /// Create a new function-based work. The closure gets its own copy of
    /// the document.
    pub fn new(work: F) -> Self {
        Self { work }
    }
}

impl<D, F, Fut> JobWork<D> for FnWork<F>
where
    D: JobDocument,
    F: Fn(D, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<D::Output, JobExecutionError>> + Send + 'static,
{
    fn execute(&self, doc: &D, cancel: CancellationToken) -> WorkFuture<D::Output> {
        Box::pin((self.work)(doc.clone(), cancel))
    }
}
