//! Worker actor for dispatching and running jobs.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use db::VersionedStore;
use job_core::{DocId, DocType, JobEvent};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::factory::JobFactory;
use crate::messages::WorkerMessage;
use crate::runnable::RunOutcome;

/// State for the worker actor.
pub struct JobWorkerState<S> {
    /// Unique worker ID.
    pub worker_id: String,
    /// Factory resolving descriptors to runnables.
    factory: Arc<JobFactory<S>>,
    /// Parent of every run's cancellation token.
    shutdown: CancellationToken,
    /// Cancellation tokens of running jobs by document.
    in_flight: HashMap<DocId, CancellationToken>,
    /// Event broadcaster.
    event_tx: Option<broadcast::Sender<JobEvent>>,
}

impl<S> JobWorkerState<S> {
    /// Create a new worker state.
    pub fn new(worker_id: impl Into<String>, factory: Arc<JobFactory<S>>) -> Self {
        Self {
            worker_id: worker_id.into(),
            factory,
            shutdown: CancellationToken::new(),
            in_flight: HashMap::new(),
            event_tx: None,
        }
    }

    /// Set the event broadcaster.
    pub fn with_event_tx(mut self, tx: broadcast::Sender<JobEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Check if the worker is idle.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    fn broadcast(&self, event: JobEvent) {
        tracing::debug!("{}", event.description());
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn outcome_event(doc_id: DocId, kind: DocType, outcome: RunOutcome) -> JobEvent {
        let timestamp = Utc::now();
        match outcome {
            RunOutcome::NotAdmitted => JobEvent::JobSkipped {
                doc_id,
                kind,
                timestamp,
            },
            RunOutcome::Finished => JobEvent::JobFinished {
                doc_id,
                kind,
                timestamp,
            },
            RunOutcome::Failed { log } => JobEvent::JobFailed {
                doc_id,
                kind,
                log,
                timestamp,
            },
            RunOutcome::Cancelled => JobEvent::JobCancelled {
                doc_id,
                kind,
                timestamp,
            },
            RunOutcome::Abandoned { reason } => JobEvent::JobAbandoned {
                doc_id,
                kind,
                reason,
                timestamp,
            },
        }
    }
}

/// Worker actor arguments.
pub struct JobWorkerArgs<S> {
    pub worker_id: String,
    pub factory: Arc<JobFactory<S>>,
    pub event_tx: Option<broadcast::Sender<JobEvent>>,
}

/// Worker actor that turns descriptors into running jobs.
///
/// Each run gets its own tokio task; the actor only tracks what is in flight
/// so runs can be cancelled individually or all at once on shutdown.
pub struct JobWorker<S> {
    _store: PhantomData<fn() -> S>,
}

impl<S> JobWorker<S> {
    pub fn new() -> Self {
        Self {
            _store: PhantomData,
        }
    }
}

impl<S> Default for JobWorker<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: VersionedStore> Actor for JobWorker<S> {
    type Msg = WorkerMessage;
    type State = JobWorkerState<S>;
    type Arguments = JobWorkerArgs<S>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting worker: {}", args.worker_id);

        let mut state = JobWorkerState::new(args.worker_id, args.factory);
        if let Some(tx) = args.event_tx {
            state = state.with_event_tx(tx);
        }

        Ok(state)
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.shutdown.cancel();
        tracing::info!("Worker stopped: {}", state.worker_id);
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Process { descriptor, reply } => {
                let doc_id = descriptor.doc_id_to_process.clone();

                if state.in_flight.contains_key(&doc_id) {
                    let _ = reply.send(Err(format!(
                        "Job {} is already running on {}",
                        doc_id, state.worker_id
                    )));
                    return Ok(());
                }

                match state.factory.create_job(&descriptor).await {
                    Ok(runnable) => {
                        let kind = runnable.kind().clone();
                        let token = state.shutdown.child_token();
                        state.in_flight.insert(doc_id.clone(), token.clone());

                        state.broadcast(JobEvent::JobDispatched {
                            doc_id: doc_id.clone(),
                            kind: kind.clone(),
                            worker_id: state.worker_id.clone(),
                            timestamp: Utc::now(),
                        });

                        let myself = myself.clone();
                        let run_kind = kind.clone();
                        tokio::spawn(async move {
                            let outcome = runnable.run(token).await;
                            // The worker may already be gone after a shutdown.
                            let _ = myself.send_message(WorkerMessage::RunCompleted {
                                doc_id,
                                kind: run_kind,
                                outcome,
                            });
                        });

                        let _ = reply.send(Ok(kind));
                    }
                    Err(e) => {
                        tracing::error!(
                            worker_id = %state.worker_id,
                            doc_id = %doc_id,
                            error = %e,
                            "unable to dispatch job"
                        );
                        state.broadcast(JobEvent::DispatchFailed {
                            doc_id,
                            worker_id: state.worker_id.clone(),
                            error: e.to_string(),
                            timestamp: Utc::now(),
                        });
                        let _ = reply.send(Err(e.to_string()));
                    }
                }
            }

            WorkerMessage::RunCompleted {
                doc_id,
                kind,
                outcome,
            } => {
                state.in_flight.remove(&doc_id);
                let event = JobWorkerState::<S>::outcome_event(doc_id, kind, outcome);
                state.broadcast(event);
            }

            WorkerMessage::Cancel { doc_id, reply } => {
                let found = match state.in_flight.get(&doc_id) {
                    Some(token) => {
                        tracing::info!(worker_id = %state.worker_id, doc_id = %doc_id, "cancelling job");
                        token.cancel();
                        true
                    }
                    None => false,
                };
                let _ = reply.send(found);
            }

            WorkerMessage::InFlight { reply } => {
                let _ = reply.send(state.in_flight.keys().cloned().collect());
            }

            WorkerMessage::Shutdown => {
                tracing::info!(
                    "Shutting down worker: {} ({} in flight)",
                    state.worker_id,
                    state.in_flight.len()
                );
                state.shutdown.cancel();
                myself.stop(None);
            }
        }

        Ok(())
    }
}
