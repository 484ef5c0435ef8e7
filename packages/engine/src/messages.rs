//! Message types for actor communication.

use job_core::{DocId, DocType, JobDescriptor};
use ractor::RpcReplyPort;

use crate::runnable::RunOutcome;

/// Messages for the JobWorker.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Resolve a descriptor and start running the job it points at.
    ///
    /// Replies once the run has been handed to a task, with the job's kind.
    Process {
        descriptor: JobDescriptor,
        reply: RpcReplyPort<Result<DocType, String>>,
    },

    /// A spawned run has ended.
    RunCompleted {
        doc_id: DocId,
        kind: DocType,
        outcome: RunOutcome,
    },

    /// Cancel an in-flight run. Replies whether the job was running here.
    Cancel {
        doc_id: DocId,
        reply: RpcReplyPort<bool>,
    },

    /// List the documents currently being run.
    InFlight { reply: RpcReplyPort<Vec<DocId>> },

    /// Cancel every in-flight run and stop the worker.
    Shutdown,
}
