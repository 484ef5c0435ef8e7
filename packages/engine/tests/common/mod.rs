#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use db::{StoreError, VersionedStore};
use job_core::{DocId, Document, Revision};
use serde_json::Value;

#[derive(Default)]
struct Inner {
    docs: HashMap<DocId, (Revision, Value)>,
    next_rev: u64,
}

impl Inner {
    fn bump(&mut self) -> Revision {
        self.next_rev += 1;
        Revision::new(format!("rev-{}", self.next_rev))
    }
}

/// In-process versioned store with the same compare-and-swap rules as the
/// real repository.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    updates: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of update calls seen, successful or not.
    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Change a stored document behind every reader's back.
    pub fn rival_write(&self, id: &DocId, change: impl FnOnce(&mut Value)) {
        let mut inner = self.inner.lock().unwrap();
        let rev = inner.bump();
        if let Some(entry) = inner.docs.get_mut(id) {
            change(&mut entry.1);
            entry.0 = rev;
        }
    }

    /// Raw stored body, for assertions.
    pub fn raw(&self, id: &DocId) -> Option<Value> {
        let inner = self.inner.lock().unwrap();
        inner.docs.get(id).map(|(_, value)| value.clone())
    }
}

fn to_value<T: Document>(doc: &T) -> Result<Value, StoreError> {
    serde_json::to_value(doc).map_err(|e| StoreError::Query(e.to_string()))
}

impl VersionedStore for MemoryStore {
    async fn retrieve<T: Document>(&self, id: &DocId) -> Result<T, StoreError> {
        let (rev, value) = {
            let inner = self.inner.lock().unwrap();
            inner
                .docs
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.clone()))?
        };
        let mut doc: T =
            serde_json::from_value(value).map_err(|e| StoreError::Query(e.to_string()))?;
        let header = doc.header_mut();
        header.id = Some(id.clone());
        header.revision = Some(rev);
        Ok(doc)
    }

    async fn insert<T: Document>(&self, doc: &mut T) -> Result<(), StoreError> {
        let id = doc.id().cloned().unwrap_or_else(DocId::generate);
        let value = to_value(doc)?;
        let rev = {
            let mut inner = self.inner.lock().unwrap();
            if inner.docs.contains_key(&id) {
                return Err(StoreError::AlreadyExists(id));
            }
            let rev = inner.bump();
            inner.docs.insert(id.clone(), (rev.clone(), value));
            rev
        };
        let header = doc.header_mut();
        header.id = Some(id);
        header.revision = Some(rev);
        Ok(())
    }

    async fn update<T: Document>(&self, doc: &T) -> Result<Revision, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let id = doc.id().cloned().ok_or(StoreError::MissingId)?;
        let expected = doc.revision().cloned().ok_or(StoreError::MissingRevision)?;
        let value = to_value(doc)?;

        let mut inner = self.inner.lock().unwrap();
        let current = match inner.docs.get(&id) {
            Some((rev, _)) => rev.clone(),
            None => return Err(StoreError::NotFound(id)),
        };
        if current != expected {
            return Err(StoreError::Conflict { doc_id: id });
        }
        let rev = inner.bump();
        inner.docs.insert(id, (rev.clone(), value));
        Ok(rev)
    }
}

type RivalChange = Arc<dyn Fn(&mut Value) + Send + Sync>;

/// Store where a rival writer slips in just before some of our updates.
#[derive(Clone)]
pub struct ContentiousStore {
    pub inner: MemoryStore,
    rival_writes_left: Arc<AtomicU32>,
    change: RivalChange,
}

impl ContentiousStore {
    /// The rival wins the next `rival_writes` races, applying `change` each time.
    pub fn new(
        inner: MemoryStore,
        rival_writes: u32,
        change: impl Fn(&mut Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            rival_writes_left: Arc::new(AtomicU32::new(rival_writes)),
            change: Arc::new(change),
        }
    }

    /// The rival wins every race.
    pub fn always(inner: MemoryStore) -> Self {
        Self::new(inner, u32::MAX, |_| {})
    }
}

impl VersionedStore for ContentiousStore {
    async fn retrieve<T: Document>(&self, id: &DocId) -> Result<T, StoreError> {
        self.inner.retrieve(id).await
    }

    async fn insert<T: Document>(&self, doc: &mut T) -> Result<(), StoreError> {
        self.inner.insert(doc).await
    }

    async fn update<T: Document>(&self, doc: &T) -> Result<Revision, StoreError> {
        let rival_wins = self
            .rival_writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if rival_wins {
            if let Some(id) = doc.id() {
                let change = Arc::clone(&self.change);
                self.inner.rival_write(id, |value| change(value));
            }
        }
        self.inner.update(doc).await
    }
}

type RejectWrite = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Store that refuses updates whose new body matches `reject`.
#[derive(Clone)]
pub struct RejectingStore {
    pub inner: MemoryStore,
    reject: RejectWrite,
}

impl RejectingStore {
    pub fn new(inner: MemoryStore, reject: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner,
            reject: Arc::new(reject),
        }
    }
}

impl VersionedStore for RejectingStore {
    async fn retrieve<T: Document>(&self, id: &DocId) -> Result<T, StoreError> {
        self.inner.retrieve(id).await
    }

    async fn insert<T: Document>(&self, doc: &mut T) -> Result<(), StoreError> {
        self.inner.insert(doc).await
    }

    async fn update<T: Document>(&self, doc: &T) -> Result<Revision, StoreError> {
        if (self.reject)(&to_value(doc)?) {
            return Err(StoreError::Query("write rejected".to_string()));
        }
        self.inner.update(doc).await
    }
}
