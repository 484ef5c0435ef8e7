//! The runnable contract every job kind is dispatched through.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use db::VersionedStore;
use job_core::{DocId, DocType, JobDocument, ProcessingState};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::lifecycle::Lifecycle;
use crate::work::JobWork;

/// Future type for a job run.
pub type RunFuture = Pin<Box<dyn Future<Output = RunOutcome> + Send>>;

/// How a run ended.
///
/// Job outcomes are always also recorded in the document itself; this is only
/// a convenience for the caller that happened to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run admitted the job first, or it was already terminal.
    NotAdmitted,
    Finished,
    /// The work failed; `log` is what was written to the document.
    Failed { log: String },
    /// Cancelled before admission (document untouched) or during the work
    /// (document marked failed).
    Cancelled,
    /// An infrastructure error kept the run from recording its outcome.
    Abandoned { reason: String },
}

/// A job handler a scheduler can run.
///
/// `run` never reports errors to its caller: every failure ends in the
/// document, so the outcome can be read back from the store by anyone.
pub trait Runnable: Send + Sync + 'static {
    fn doc_id(&self) -> &DocId;

    fn kind(&self) -> &DocType;

    fn run(self: Box<Self>, cancel: CancellationToken) -> RunFuture;
}

/// Runs one job document of kind `D` through its lifecycle.
pub struct JobRunner<D: JobDocument, S> {
    doc_id: DocId,
    kind: DocType,
    doc: D,
    lifecycle: Lifecycle<S>,
    work: Arc<dyn JobWork<D>>,
}

impl<D: JobDocument, S: VersionedStore> JobRunner<D, S> {
    pub fn new(doc_id: DocId, doc: D, lifecycle: Lifecycle<S>, work: Arc<dyn JobWork<D>>) -> Self {
        Self {
            doc_id,
            kind: D::DOC_TYPE,
            doc,
            lifecycle,
            work,
        }
    }

    /// The job document as this runner last saw it.
    pub fn document(&self) -> &D {
        &self.doc
    }

    async fn execute(mut self, cancel: CancellationToken) -> RunOutcome {
        info!(doc_id = %self.doc_id, kind = %self.kind, "run called");

        if cancel.is_cancelled() {
            info!(doc_id = %self.doc_id, "cancelled before admission, leaving job pending");
            return RunOutcome::Cancelled;
        }

        match self.lifecycle.admit(&mut self.doc).await {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    doc_id = %self.doc_id,
                    state = %self.doc.processing_state(),
                    "already processed, ignoring"
                );
                return RunOutcome::NotAdmitted;
            }
            Err(e) => {
                error!(doc_id = %self.doc_id, error = %e, "unable to admit job");
                return RunOutcome::Abandoned {
                    reason: e.to_string(),
                };
            }
        }

        let work = self.work.execute(&self.doc, cancel.clone());
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = work => Some(result),
        };

        match result {
            Some(Ok(output)) => self.record_success(output).await,
            Some(Err(e)) => {
                warn!(doc_id = %self.doc_id, error = %e, "job work failed");
                let log = e.to_string();
                self.record_failure(log.clone(), RunOutcome::Failed { log })
                    .await
            }
            None => {
                warn!(doc_id = %self.doc_id, "job cancelled while processing");
                self.record_failure(
                    "cancelled: job was cancelled while processing".to_string(),
                    RunOutcome::Cancelled,
                )
                .await
            }
        }
    }

    async fn record_success(mut self, output: D::Output) -> RunOutcome {
        match self.lifecycle.finish(&mut self.doc, output).await {
            Ok(_) => self.settled(RunOutcome::Finished),
            Err(e) => {
                warn!(doc_id = %self.doc_id, error = %e, "unable to record results, failing job");
                let log = format!("unable to record results: {e}");
                self.record_failure(log.clone(), RunOutcome::Failed { log })
                    .await
            }
        }
    }

    async fn record_failure(mut self, log: String, outcome: RunOutcome) -> RunOutcome {
        match self.lifecycle.fail(&mut self.doc, log).await {
            Ok(_) => self.settled(outcome),
            Err(e) => self.abandon(e.to_string()),
        }
    }

    /// The outcome the stored document actually shows, which is a concurrent
    /// writer's when it closed the job out first.
    fn settled(&self, intended: RunOutcome) -> RunOutcome {
        let state = self.doc.processing_state();
        let agrees = match state {
            ProcessingState::Finished => intended == RunOutcome::Finished,
            ProcessingState::Failed => {
                matches!(intended, RunOutcome::Failed { .. } | RunOutcome::Cancelled)
            }
            _ => false,
        };
        if agrees {
            return intended;
        }

        match state {
            ProcessingState::Finished => {
                info!(doc_id = %self.doc_id, "job was finished by a concurrent run");
                RunOutcome::Finished
            }
            ProcessingState::Failed => RunOutcome::Failed {
                log: self.doc.processing_log().to_string(),
            },
            state => self.abandon(format!("job left in state {state}")),
        }
    }

    fn abandon(&self, reason: String) -> RunOutcome {
        error!(
            doc_id = %self.doc_id,
            error = %reason,
            "unable to record job outcome, document may need supervision"
        );
        RunOutcome::Abandoned { reason }
    }
}

impl<D: JobDocument, S: VersionedStore> Runnable for JobRunner<D, S> {
    fn doc_id(&self) -> &DocId {
        &self.doc_id
    }

    fn kind(&self) -> &DocType {
        &self.kind
    }

    fn run(self: Box<Self>, cancel: CancellationToken) -> RunFuture {
        Box::pin((*self).execute(cancel))
    }
}
