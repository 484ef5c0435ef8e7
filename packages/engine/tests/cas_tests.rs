#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;

use common::{ContentiousStore, MemoryStore};
use db::{StoreError, VersionedStore};
use engine::{CasError, CasPolicy, cas_update};
use job_core::{ClassifyJob, Document};
use serde_json::Value;

fn fast_policy(max_attempts: u32) -> CasPolicy {
    CasPolicy::default()
        .with_max_attempts(max_attempts)
        .without_backoff()
}

#[tokio::test]
async fn test_update_writes_and_rotates_revision() -> Result<(), Box<dyn Error>> {
    let store = MemoryStore::new();
    let mut job = ClassifyJob::new("classifier-1");
    store.insert(&mut job).await?;
    let before = job.revision().cloned();

    let changed = cas_update(
        &store,
        &fast_policy(3),
        &mut job,
        |j| j.processing_log = "loading model".to_string(),
        |j| j.processing_log == "loading model",
    )
    .await?;

    assert!(changed);
    assert_ne!(job.revision().cloned(), before);

    let stored: ClassifyJob = store.retrieve(job.id().unwrap()).await?;
    assert_eq!(stored.processing_log, "loading model");
    assert_eq!(stored.revision(), job.revision());
    Ok(())
}

#[tokio::test]
async fn test_conflict_retry_applies_to_fresh_content() -> Result<(), Box<dyn Error>> {
    let memory = MemoryStore::new();
    let mut job = ClassifyJob::new("classifier-1").with_images(["img/a.png"]);
    memory.insert(&mut job).await?;

    // The rival labels an image between our read and our write.
    let store = ContentiousStore::new(memory.clone(), 1, |value: &mut Value| {
        value["results"]["img/a.png"] = Value::String("cat".to_string());
    });

    let changed = cas_update(
        &store,
        &fast_policy(5),
        &mut job,
        |j| j.processing_log = "mine".to_string(),
        |j| j.processing_log == "mine",
    )
    .await?;

    assert!(changed);
    assert_eq!(memory.update_calls(), 2);

    let stored: ClassifyJob = memory.retrieve(job.id().unwrap()).await?;
    assert_eq!(stored.processing_log, "mine");
    assert_eq!(stored.results.get("img/a.png").map(String::as_str), Some("cat"));
    assert_eq!(job, stored);
    Ok(())
}

#[tokio::test]
async fn test_rival_already_applied_change_skips_write() -> Result<(), Box<dyn Error>> {
    let memory = MemoryStore::new();
    let mut job = ClassifyJob::new("classifier-1");
    memory.insert(&mut job).await?;

    let store = ContentiousStore::new(memory.clone(), 1, |value: &mut Value| {
        value["processing_log"] = Value::String("mine".to_string());
    });

    let changed = cas_update(
        &store,
        &fast_policy(5),
        &mut job,
        |j| j.processing_log = "mine".to_string(),
        |j| j.processing_log == "mine",
    )
    .await?;

    assert!(!changed);
    assert_eq!(memory.update_calls(), 1);
    assert_eq!(job.processing_log, "mine");
    Ok(())
}

#[tokio::test]
async fn test_done_on_entry_never_writes() -> Result<(), Box<dyn Error>> {
    let store = MemoryStore::new();
    let mut job = ClassifyJob::new("classifier-1");
    store.insert(&mut job).await?;

    let changed = cas_update(
        &store,
        &fast_policy(3),
        &mut job,
        |j| j.processing_log.clear(),
        |j| j.processing_log.is_empty(),
    )
    .await?;

    assert!(!changed);
    assert_eq!(store.update_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_single_attempt_sees_rival_applied_change() -> Result<(), Box<dyn Error>> {
    let memory = MemoryStore::new();
    let mut job = ClassifyJob::new("classifier-1");
    memory.insert(&mut job).await?;

    let store = ContentiousStore::new(memory.clone(), 1, |value: &mut Value| {
        value["processing_log"] = Value::String("mine".to_string());
    });

    let changed = cas_update(
        &store,
        &fast_policy(1),
        &mut job,
        |j| j.processing_log = "mine".to_string(),
        |j| j.processing_log == "mine",
    )
    .await?;

    assert!(!changed);
    assert_eq!(memory.update_calls(), 1);
    assert_eq!(job.processing_log, "mine");
    Ok(())
}

#[tokio::test]
async fn test_gives_up_after_bounded_attempts() -> Result<(), Box<dyn Error>> {
    let memory = MemoryStore::new();
    let mut job = ClassifyJob::new("classifier-1");
    memory.insert(&mut job).await?;
    let store = ContentiousStore::always(memory.clone());

    let result = cas_update(
        &store,
        &fast_policy(4),
        &mut job,
        |j| j.processing_log = "never lands".to_string(),
        |j| j.processing_log == "never lands",
    )
    .await;

    match result {
        Err(CasError::ConcurrencyExhausted { doc_id, attempts }) => {
            assert_eq!(Some(&doc_id), job.id());
            assert_eq!(attempts, 4);
        }
        other => panic!("expected ConcurrencyExhausted, got {other:?}"),
    }
    assert_eq!(memory.update_calls(), 4);

    let stored: ClassifyJob = memory.retrieve(job.id().unwrap()).await?;
    assert_eq!(stored.processing_log, "");
    Ok(())
}

#[tokio::test]
async fn test_store_errors_are_not_retried() -> Result<(), Box<dyn Error>> {
    let store = MemoryStore::new();
    let mut never_stored = ClassifyJob::new("classifier-1");

    let result = cas_update(
        &store,
        &fast_policy(5),
        &mut never_stored,
        |j| j.processing_log = "x".to_string(),
        |_| false,
    )
    .await;

    assert!(matches!(result, Err(CasError::Store(StoreError::MissingId))));
    assert_eq!(store.update_calls(), 0);
    Ok(())
}
