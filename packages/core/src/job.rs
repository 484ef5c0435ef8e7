//! Job documents and their processing lifecycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{DocId, DocType, Document};

/// Processing state of a job document.
///
/// `Finished` and `Failed` are terminal: once a document reaches one of them
/// it never moves again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    /// Inserted by a producer, not yet picked up.
    #[default]
    Pending,
    /// Admitted by exactly one worker.
    Processing,
    Finished,
    Failed,
}

/// How a requested state change relates to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The change is legal and has not happened yet.
    Apply,
    /// The document is already at (or past) the requested state.
    AlreadyReached,
    /// The change skips a state or leaves a terminal state.
    Illegal,
}

impl ProcessingState {
    /// Check if the state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Finished | ProcessingState::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            ProcessingState::Pending => 0,
            ProcessingState::Processing => 1,
            ProcessingState::Finished | ProcessingState::Failed => 2,
        }
    }

    /// Classify a request to move from `self` to `target`.
    pub fn check_transition(self, target: ProcessingState) -> Transition {
        use ProcessingState::*;

        if self == target || target.rank() < self.rank() {
            return Transition::AlreadyReached;
        }
        match (self, target) {
            (Pending, Processing) | (Processing, Finished) | (Processing, Failed) => {
                Transition::Apply
            }
            _ => Transition::Illegal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "pending",
            ProcessingState::Processing => "processing",
            ProcessingState::Finished => "finished",
            ProcessingState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document that moves through the processing lifecycle.
pub trait JobDocument: Document {
    /// Type tag stored in every document of this kind.
    const DOC_TYPE: DocType;

    /// Result payload written atomically with the `Finished` transition.
    type Output: Clone + Send + Sync + 'static;

    fn processing_state(&self) -> ProcessingState;

    fn set_processing_state(&mut self, state: ProcessingState);

    fn processing_log(&self) -> &str;

    fn set_processing_log(&mut self, log: String);

    fn apply_output(&mut self, output: Self::Output);
}

/// Points a scheduler at the document it wants processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub doc_id_to_process: DocId,
}

impl JobDescriptor {
    pub fn new(doc_id: impl Into<DocId>) -> Self {
        Self {
            doc_id_to_process: doc_id.into(),
        }
    }
}

/// Failure raised by a job kind's own work.
///
/// The rendered message becomes the processing log of the failed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct JobExecutionError(pub String);

impl JobExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for JobExecutionError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for JobExecutionError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessingState::*;
    use super::*;

    #[test]
    fn forward_edges_apply() {
        assert_eq!(Pending.check_transition(Processing), Transition::Apply);
        assert_eq!(Processing.check_transition(Finished), Transition::Apply);
        assert_eq!(Processing.check_transition(Failed), Transition::Apply);
    }

    #[test]
    fn terminal_states_never_move() {
        for terminal in [Finished, Failed] {
            assert!(terminal.is_terminal());
            assert_eq!(terminal.check_transition(Pending), Transition::AlreadyReached);
            assert_eq!(terminal.check_transition(Processing), Transition::AlreadyReached);
            assert_eq!(terminal.check_transition(terminal), Transition::AlreadyReached);
        }
        assert_eq!(Finished.check_transition(Failed), Transition::Illegal);
        assert_eq!(Failed.check_transition(Finished), Transition::Illegal);
    }

    #[test]
    fn skipping_processing_is_illegal() {
        assert_eq!(Pending.check_transition(Finished), Transition::Illegal);
        assert_eq!(Pending.check_transition(Failed), Transition::Illegal);
    }

    #[test]
    fn readmission_is_already_reached() {
        assert_eq!(Processing.check_transition(Processing), Transition::AlreadyReached);
        assert_eq!(Processing.check_transition(Pending), Transition::AlreadyReached);
    }

    #[test]
    fn states_serialize_lowercase() {
        let json = serde_json::to_string(&Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
