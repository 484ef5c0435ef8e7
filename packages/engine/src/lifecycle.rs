//! Job lifecycle state machine on top of the optimistic update engine.

use db::VersionedStore;
use job_core::{JobDocument, ProcessingState, Transition};
use thiserror::Error;
use tracing::info;

use crate::cas::{CasError, CasPolicy, cas_update};

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The caller asked for a move the state machine never allows.
    #[error("Illegal transition {from} -> {to}")]
    IllegalTransition {
        from: ProcessingState,
        to: ProcessingState,
    },
    #[error(transparent)]
    Cas(#[from] CasError),
}

/// Drives job documents through `Pending -> Processing -> Finished | Failed`.
#[derive(Clone)]
pub struct Lifecycle<S> {
    store: S,
    policy: CasPolicy,
}

impl<S: VersionedStore> Lifecycle<S> {
    pub fn new(store: S, policy: CasPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Move `doc` to `target`, applying `also` in the same write.
    ///
    /// Returns `Ok(false)` when the stored document is already at or past
    /// `target`, including when a concurrent writer moved it there.
    pub async fn transition<D, M>(
        &self,
        doc: &mut D,
        target: ProcessingState,
        mut also: M,
    ) -> Result<bool, LifecycleError>
    where
        D: JobDocument,
        M: FnMut(&mut D) + Send,
    {
        let from = doc.processing_state();
        if from.check_transition(target) == Transition::Illegal {
            return Err(LifecycleError::IllegalTransition { from, to: target });
        }

        let changed = cas_update(
            &self.store,
            &self.policy,
            doc,
            |d| {
                d.set_processing_state(target);
                also(d);
            },
            |d| d.processing_state().check_transition(target) != Transition::Apply,
        )
        .await?;

        if changed {
            info!(doc_id = ?doc.id(), kind = %D::DOC_TYPE, from = %from, to = %target, "job state changed");
        }

        Ok(changed)
    }

    /// Admit the job for processing. Exactly one concurrent caller sees `true`.
    pub async fn admit<D: JobDocument>(&self, doc: &mut D) -> Result<bool, LifecycleError> {
        self.transition(doc, ProcessingState::Processing, |_| {})
            .await
    }

    /// Record results and mark the job finished in one write.
    pub async fn finish<D: JobDocument>(
        &self,
        doc: &mut D,
        output: D::Output,
    ) -> Result<bool, LifecycleError> {
        self.transition(doc, ProcessingState::Finished, move |d| {
            d.apply_output(output.clone())
        })
        .await
    }

    /// Mark the job failed with `log` as its processing log in one write.
    pub async fn fail<D: JobDocument>(
        &self,
        doc: &mut D,
        log: impl Into<String>,
    ) -> Result<bool, LifecycleError> {
        let log = log.into();
        self.transition(doc, ProcessingState::Failed, move |d| {
            d.set_processing_log(log.clone())
        })
        .await
    }

    /// Replace the processing log, leaving the state alone.
    pub async fn update_processing_log<D: JobDocument>(
        &self,
        doc: &mut D,
        log: impl Into<String>,
    ) -> Result<bool, LifecycleError> {
        let log = log.into();
        let changed = cas_update(
            &self.store,
            &self.policy,
            doc,
            |d| d.set_processing_log(log.clone()),
            |d| d.processing_log() == log,
        )
        .await?;
        Ok(changed)
    }
}
