//! Optimistic update engine.
//!
//! [`cas_update`] separates *what* changes in a document (a caller-supplied
//! mutation) from *how* it is written safely (retry on revision conflict).
//! Every field-level update in the engine goes through it.
//!
//! The mutation may run once per attempt, so it must be a pure function of
//! the document it is handed: no I/O and no effects outside the document.

use std::time::Duration;

use db::{StoreError, VersionedStore};
use job_core::{DocId, Document};
use thiserror::Error;
use tracing::{debug, warn};

/// Bounds for the conflict retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasPolicy {
    /// Total write attempts before giving up. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause after the first conflict, doubled after each further one.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for CasPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(64),
        }
    }
}

impl CasPolicy {
    /// Set the maximum number of write attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the initial backoff between attempts.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// No pause between attempts.
    pub fn without_backoff(mut self) -> Self {
        self.initial_backoff = Duration::ZERO;
        self.max_backoff = Duration::ZERO;
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << shift)
            .min(self.max_backoff)
    }
}

/// Errors surfaced by the optimistic update engine.
///
/// A single revision conflict never appears here; it is always retried.
#[derive(Debug, Error)]
pub enum CasError {
    #[error("Gave up updating document {doc_id} after {attempts} conflicting attempts")]
    ConcurrencyExhausted { doc_id: DocId, attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Apply `mutate` to `doc` and persist it, retrying on revision conflicts.
///
/// Returns `Ok(false)` without writing when `is_done` already holds for the
/// stored content, either on entry or after a conflict refresh. On success
/// `doc` holds the written content and its new revision.
pub async fn cas_update<S, D, M, F>(
    store: &S,
    policy: &CasPolicy,
    doc: &mut D,
    mut mutate: M,
    is_done: F,
) -> Result<bool, CasError>
where
    S: VersionedStore,
    D: Document,
    M: FnMut(&mut D) + Send,
    F: Fn(&D) -> bool + Send,
{
    let attempts = policy.attempts();
    let doc_id = doc.id().cloned().ok_or(StoreError::MissingId)?;

    for attempt in 1..=attempts {
        if is_done(doc) {
            debug!(doc_id = %doc_id, attempt, "update already applied, skipping write");
            return Ok(false);
        }

        let mut working = doc.clone();
        mutate(&mut working);

        match store.update(&working).await {
            Ok(revision) => {
                working.header_mut().revision = Some(revision);
                *doc = working;
                return Ok(true);
            }
            Err(StoreError::Conflict { .. }) => {
                warn!(doc_id = %doc_id, attempt, attempts, "revision conflict, reloading document");
                if attempt < attempts {
                    let backoff = policy.backoff(attempt);
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
                *doc = store.retrieve(&doc_id).await?;
            }
            Err(e) => return Err(CasError::Store(e)),
        }
    }

    // The last refresh may show a concurrent writer already did our work.
    if is_done(doc) {
        debug!(doc_id = %doc_id, attempts, "update applied concurrently, skipping write");
        return Ok(false);
    }

    Err(CasError::ConcurrencyExhausted { doc_id, attempts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = CasPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1));
        assert_eq!(policy.backoff(2), Duration::from_millis(2));
        assert_eq!(policy.backoff(4), Duration::from_millis(8));
        assert_eq!(policy.backoff(30), Duration::from_millis(64));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = CasPolicy::default().with_max_attempts(0);
        assert_eq!(policy.attempts(), 1);
    }
}
