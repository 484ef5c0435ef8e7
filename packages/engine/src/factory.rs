//! Job factory: resolves a descriptor to the runnable for its document kind.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use db::{StoreError, VersionedStore};
use job_core::{BaseDocument, DocId, DocType, Document, JobDescriptor, JobDocument};
use thiserror::Error;
use tracing::{debug, error};

use crate::cas::CasPolicy;
use crate::config::EngineConfig;
use crate::lifecycle::Lifecycle;
use crate::runnable::{JobRunner, Runnable};
use crate::work::JobWork;

/// Factory errors.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("No job kind registered for type '{doc_type}' (document {doc_id})")]
    UnknownJobKind { doc_id: DocId, doc_type: DocType },
    #[error("Didn't retrieve {doc_id}: {source}")]
    Store {
        doc_id: DocId,
        #[source]
        source: StoreError,
    },
}

type ConstructFuture = Pin<Box<dyn Future<Output = Result<Box<dyn Runnable>, StoreError>> + Send>>;

type Constructor<S> = Box<dyn Fn(S, CasPolicy, DocId) -> ConstructFuture + Send + Sync>;

/// Registry of job kinds, keyed by document type tag.
///
/// Kinds are registered once at startup. Adding a kind means one
/// [`JobDocument`] type, one [`JobWork`] and one `register` call; nothing that
/// schedules jobs changes.
pub struct JobFactory<S> {
    store: S,
    config: EngineConfig,
    constructors: HashMap<DocType, Constructor<S>>,
}

impl<S: VersionedStore> JobFactory<S> {
    /// Create a factory with no kinds registered.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            constructors: HashMap::new(),
        }
    }

    /// Register the work for documents of kind `D`.
    ///
    /// A later registration for the same type tag replaces the earlier one.
    pub fn register<D: JobDocument>(&mut self, work: impl JobWork<D>) -> &mut Self {
        let work: Arc<dyn JobWork<D>> = Arc::new(work);

        let constructor: Constructor<S> = Box::new(move |store: S, policy: CasPolicy, id: DocId| {
            let work = Arc::clone(&work);
            Box::pin(async move {
                let doc: D = store.retrieve(&id).await?;
                let runnable: Box<dyn Runnable> =
                    Box::new(JobRunner::new(id, doc, Lifecycle::new(store, policy), work));
                Ok(runnable)
            })
        });

        self.constructors.insert(D::DOC_TYPE, constructor);
        self
    }

    /// Check if a kind is registered for the type tag.
    pub fn is_registered(&self, doc_type: &DocType) -> bool {
        self.constructors.contains_key(doc_type)
    }

    /// List all registered type tags.
    pub fn job_kinds(&self) -> Vec<&DocType> {
        self.constructors.keys().collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build the runnable for the document the descriptor points at.
    ///
    /// The document is read twice: once as a bare header to learn its type
    /// tag, then again as the concrete kind.
    pub async fn create_job(
        &self,
        descriptor: &JobDescriptor,
    ) -> Result<Box<dyn Runnable>, FactoryError> {
        let doc_id = descriptor.doc_id_to_process.clone();

        let base: BaseDocument = self
            .store
            .retrieve(&doc_id)
            .await
            .map_err(|source| FactoryError::Store {
                doc_id: doc_id.clone(),
                source,
            })?;

        let doc_type = base.doc_type().clone();
        let Some(constructor) = self.constructors.get(&doc_type) else {
            error!(doc_id = %doc_id, doc_type = %doc_type, "unable to create job for unknown kind");
            return Err(FactoryError::UnknownJobKind { doc_id, doc_type });
        };

        debug!(doc_id = %doc_id, doc_type = %doc_type, "creating job");

        constructor(self.store.clone(), self.config.cas.clone(), doc_id.clone())
            .await
            .map_err(|source| {
                error!(doc_id = %doc_id, error = %source, "didn't retrieve typed document");
                FactoryError::Store { doc_id, source }
            })
    }
}
