//! Event types for observing job runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{DocId, DocType};

/// Events emitted by workers as they dispatch and run jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A descriptor was resolved to a runnable and handed to a task.
    JobDispatched {
        doc_id: DocId,
        kind: DocType,
        worker_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A descriptor could not be resolved (unknown kind, store error).
    DispatchFailed {
        doc_id: DocId,
        worker_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// Another run had already admitted the job.
    JobSkipped {
        doc_id: DocId,
        kind: DocType,
        timestamp: DateTime<Utc>,
    },
    JobFinished {
        doc_id: DocId,
        kind: DocType,
        timestamp: DateTime<Utc>,
    },
    JobFailed {
        doc_id: DocId,
        kind: DocType,
        log: String,
        timestamp: DateTime<Utc>,
    },
    JobCancelled {
        doc_id: DocId,
        kind: DocType,
        timestamp: DateTime<Utc>,
    },
    /// The run could not record a terminal state in the store.
    JobAbandoned {
        doc_id: DocId,
        kind: DocType,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobDispatched { timestamp, .. }
            | JobEvent::DispatchFailed { timestamp, .. }
            | JobEvent::JobSkipped { timestamp, .. }
            | JobEvent::JobFinished { timestamp, .. }
            | JobEvent::JobFailed { timestamp, .. }
            | JobEvent::JobCancelled { timestamp, .. }
            | JobEvent::JobAbandoned { timestamp, .. } => *timestamp,
        }
    }

    /// Get the document the event is about.
    pub fn doc_id(&self) -> &DocId {
        match self {
            JobEvent::JobDispatched { doc_id, .. }
            | JobEvent::DispatchFailed { doc_id, .. }
            | JobEvent::JobSkipped { doc_id, .. }
            | JobEvent::JobFinished { doc_id, .. }
            | JobEvent::JobFailed { doc_id, .. }
            | JobEvent::JobCancelled { doc_id, .. }
            | JobEvent::JobAbandoned { doc_id, .. } => doc_id,
        }
    }

    /// Whether the event closes out a run.
    pub fn is_run_outcome(&self) -> bool {
        !matches!(
            self,
            JobEvent::JobDispatched { .. } | JobEvent::DispatchFailed { .. }
        )
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::JobDispatched {
                doc_id,
                kind,
                worker_id,
                ..
            } => format!("{} {} dispatched to {}", kind, doc_id, worker_id),
            JobEvent::DispatchFailed { doc_id, error, .. } => {
                format!("Dispatch of {} failed: {}", doc_id, error)
            }
            JobEvent::JobSkipped { doc_id, kind, .. } => {
                format!("{} {} already processed, skipped", kind, doc_id)
            }
            JobEvent::JobFinished { doc_id, kind, .. } => format!("{} {} finished", kind, doc_id),
            JobEvent::JobFailed {
                doc_id, kind, log, ..
            } => format!("{} {} failed: {}", kind, doc_id, log),
            JobEvent::JobCancelled { doc_id, kind, .. } => {
                format!("{} {} cancelled", kind, doc_id)
            }
            JobEvent::JobAbandoned {
                doc_id,
                kind,
                reason,
                ..
            } => format!("{} {} abandoned: {}", kind, doc_id, reason),
        }
    }
}
