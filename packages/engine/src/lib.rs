//! Job engine: safe state transitions and kind-based dispatch for jobs whose
//! state lives in a versioned document store.
//!
//! # Architecture
//!
//! - [`cas_update`] - retry-on-conflict update of a single document
//! - [`Lifecycle`] - `Pending -> Processing -> Finished | Failed` on top of it
//! - [`JobFactory`] - registry resolving a [`JobDescriptor`] to a [`Runnable`]
//! - [`JobWorker`] - actor that dispatches descriptors and tracks running jobs
//!
//! # Usage
//!
//! ```ignore
//! use engine::{EngineConfig, FnWork, JobFactory};
//! use job_core::{ClassifyJob, JobDescriptor};
//!
//! let mut factory = JobFactory::new(store, EngineConfig::default());
//! factory.register::<ClassifyJob>(FnWork::new(|job: ClassifyJob, _cancel| async move {
//!     classify(&job).await
//! }));
//!
//! let runnable = factory.create_job(&JobDescriptor::new("job-1")).await?;
//! let outcome = runnable.run(CancellationToken::new()).await;
//! ```
//!
//! [`JobDescriptor`]: job_core::JobDescriptor

mod cas;
mod config;
mod factory;
mod lifecycle;
mod messages;
mod runnable;
pub mod telemetry;
mod work;
mod worker_actor;

pub use cas::{CasError, CasPolicy, cas_update};
pub use config::{ConfigError, EngineConfig};
pub use factory::{FactoryError, JobFactory};
pub use lifecycle::{Lifecycle, LifecycleError};
pub use messages::WorkerMessage;
pub use runnable::{JobRunner, RunFuture, RunOutcome, Runnable};
pub use work::{FnWork, JobWork, WorkFuture};
pub use worker_actor::{JobWorker, JobWorkerArgs, JobWorkerState};

/// Re-export cancellation and ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort};
pub use tokio_util::sync::CancellationToken;
