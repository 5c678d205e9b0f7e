mod common;

use common::{gateway, loaded_session, session, ScriptedBackend};
use std::sync::Arc;
use tasklane_core::{
    FixedClock, SequentialIdProvider, StorageError, StoreError, Task, TaskStore, TASKS_KEY,
};

fn task_titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.title.as_str()).collect()
}

#[tokio::test]
async fn delayed_first_write_does_not_overwrite_second() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let tasks = session.tasks();
    let writes_before = backend.write_calls();

    let release = backend.hold_next_write();
    let first = tasks.add_task("first", None);
    backend.wait_until_held().await;
    let second = tasks.add_task("second", None);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(
        backend.write_calls(),
        writes_before + 1,
        "second write must wait for the first"
    );
    assert_eq!(task_titles(&tasks.tasks()), vec!["first", "second"]);

    release.send(()).unwrap();
    first.await.unwrap();
    second.await.unwrap();

    let stored: Vec<Task> = backend.stored(TASKS_KEY).unwrap();
    assert_eq!(task_titles(&stored), vec!["first", "second"]);
}

#[tokio::test]
async fn back_to_back_mutations_never_lose_updates() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let tasks = session.tasks();

    let pending: Vec<_> = (0..25)
        .map(|n| tasks.add_task(&format!("task {n}"), None))
        .collect();
    let versions: Vec<u64> = pending.iter().filter_map(|m| m.version()).collect();
    assert!(versions.windows(2).all(|pair| pair[1] == pair[0] + 1));

    for mutation in pending {
        mutation.await.unwrap();
    }
    let stored: Vec<Task> = backend.stored(TASKS_KEY).unwrap();
    assert_eq!(stored.len(), 25);
    assert_eq!(stored.as_slice(), &*tasks.tasks());
}

#[tokio::test]
async fn failed_write_keeps_memory_and_later_writes_land() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let tasks = session.tasks();

    backend.fail_next_write();
    let failed = tasks.add_task("optimistic", None);
    let failed_version = failed.version().unwrap();
    let next = tasks.add_task("follow-up", None);

    match failed.await {
        Err(StoreError::StorageWriteFailed {
            key,
            version,
            source,
        }) => {
            assert_eq!(key, TASKS_KEY);
            assert_eq!(version, failed_version);
            assert!(matches!(source, StorageError::Backend(_)));
        }
        other => panic!("expected write failure, got {other:?}"),
    }
    assert!(next.await.unwrap().is_some());

    assert_eq!(task_titles(&tasks.tasks()), vec!["optimistic", "follow-up"]);
    let stored: Vec<Task> = backend.stored(TASKS_KEY).unwrap();
    assert_eq!(task_titles(&stored), vec!["optimistic", "follow-up"]);
}

#[tokio::test]
async fn write_failure_is_not_fatal() {
    let err = StoreError::StorageWriteFailed {
        key: TASKS_KEY,
        version: 3,
        source: StorageError::Backend("full".to_string()),
    };
    assert!(!err.is_fatal());
    assert!(StoreError::NotLoaded(TASKS_KEY).is_fatal());
}

#[tokio::test]
async fn init_failure_is_fatal_and_cached() {
    let backend = ScriptedBackend::failing_init();
    let session = session(&backend);

    let err = session.load().await.unwrap_err();
    assert!(matches!(err, StoreError::StorageInitFailed(StorageError::Init(_))));

    let again = session.gateway().initialize().await.unwrap_err();
    assert!(matches!(again, StorageError::Init(_)));
    assert_eq!(backend.init_calls(), 1);
    assert!(!session.gateway().is_ready());

    let rejected = session.tasks().add_task("cannot stick", None);
    assert!(matches!(rejected.await, Err(StoreError::NotLoaded(_))));
    assert!(session.tasks().tasks().is_empty());
}

#[tokio::test]
async fn concurrent_initialization_runs_once() {
    let backend = ScriptedBackend::new();
    let gateway = gateway(&backend);

    let (a, b, c) = tokio::join!(
        gateway.initialize(),
        gateway.initialize(),
        gateway.initialize()
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(backend.init_calls(), 1);
}

#[tokio::test]
async fn stores_sharing_a_gateway_write_separate_keys() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;

    session.tasks().add_task("one", Some("planning")).await.unwrap();
    session.categories().add_category("Two", None).await.unwrap();

    let tasks: Vec<Task> = backend.stored(TASKS_KEY).unwrap();
    let categories: Vec<tasklane_core::Category> =
        backend.stored(tasklane_core::CATEGORIES_KEY).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(categories.len(), 5);
    assert_eq!(backend.init_calls(), 1);
}

#[tokio::test]
async fn flush_waits_for_unawaited_writes() {
    let backend = ScriptedBackend::new();
    let store = TaskStore::new(
        gateway(&backend),
        Arc::new(SequentialIdProvider::new("t")),
        Arc::new(FixedClock(0)),
    );
    store.load().await.unwrap();

    let _ = store.add_task("fire", None);
    let _ = store.add_task("and forget", None);
    store.flush().await;

    let stored: Vec<Task> = backend.stored(TASKS_KEY).unwrap();
    assert_eq!(task_titles(&stored), vec!["fire", "and forget"]);
}
