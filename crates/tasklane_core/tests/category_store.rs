mod common;

use common::{gateway, loaded_session, ScriptedBackend};
use std::sync::Arc;
use tasklane_core::{
    default_categories, Category, CategoryStore, SequentialIdProvider, SkipReason, StoreError,
    CATEGORIES_KEY,
};

#[tokio::test]
async fn empty_storage_seeds_four_defaults_and_persists_them() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;

    let categories = session.categories().categories();
    assert_eq!(categories.len(), 4);
    assert_eq!(categories.to_vec(), default_categories());

    let stored: Vec<Category> = backend.stored(CATEGORIES_KEY).unwrap();
    assert_eq!(stored, default_categories());
}

#[tokio::test]
async fn second_load_does_not_duplicate_defaults() {
    let backend = ScriptedBackend::new();
    let store = CategoryStore::new(gateway(&backend), Arc::new(SequentialIdProvider::new("cat")));

    store.load().await.unwrap();
    let version = store.version();
    store.load().await.unwrap();

    assert_eq!(store.category_count(), 4);
    assert_eq!(store.version(), version);
    assert_eq!(backend.write_calls(), 1);
}

#[tokio::test]
async fn restart_reads_persisted_categories_instead_of_reseeding() {
    let backend = ScriptedBackend::new();
    {
        let session = loaded_session(&backend).await;
        session.categories().delete_category("meetings").await.unwrap();
    }

    let restarted = loaded_session(&backend).await;
    let ids: Vec<String> = restarted
        .categories()
        .categories()
        .iter()
        .map(|category| category.id.clone())
        .collect();
    assert_eq!(ids, vec!["planning", "execution", "reporting"]);
}

#[tokio::test]
async fn persisted_empty_collection_is_not_reseeded() {
    let backend = ScriptedBackend::new();
    backend.seed_raw(CATEGORIES_KEY, "[]");

    let session = loaded_session(&backend).await;

    assert_eq!(session.categories().category_count(), 0);
    assert_eq!(backend.write_calls(), 0);
}

#[tokio::test]
async fn add_category_trims_name_and_keeps_color() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let categories = session.categories();

    let id = categories
        .add_category("  Errands ", Some("#ec4899"))
        .await
        .unwrap()
        .unwrap();

    let created = categories.get_category(&id).unwrap();
    assert_eq!(created.name, "Errands");
    assert_eq!(created.color.as_deref(), Some("#ec4899"));
    assert_eq!(categories.category_count(), 5);
    assert_eq!(categories.categories().last().unwrap().id, id);
}

#[tokio::test]
async fn blank_names_are_skipped() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let categories = session.categories();
    let version = categories.version();

    let add = categories.add_category(" \t ", None);
    let update = categories.update_category("planning", "", Some("#000000"));
    assert_eq!(add.skip_reason(), Some(SkipReason::EmptyText));
    assert_eq!(update.skip_reason(), Some(SkipReason::EmptyText));
    drop((add, update));

    assert_eq!(categories.version(), version);
    assert_eq!(categories.get_category("planning").unwrap().name, "Planning");
}

#[tokio::test]
async fn update_category_replaces_in_place() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let categories = session.categories();

    categories
        .update_category("execution", " Doing ", None)
        .await
        .unwrap();

    let all = categories.categories();
    assert_eq!(all[1].id, "execution");
    assert_eq!(all[1].name, "Doing");
    assert_eq!(all[1].color, None);
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn update_and_delete_of_unknown_id_are_skipped() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let categories = session.categories();

    let update = categories.update_category("nope", "Name", None);
    let delete = categories.delete_category("nope");
    assert_eq!(update.skip_reason(), Some(SkipReason::NotFound));
    assert_eq!(delete.skip_reason(), Some(SkipReason::NotFound));
    drop((update, delete));
    assert_eq!(categories.category_count(), 4);
}

#[tokio::test]
async fn deleting_a_category_keeps_its_tasks() {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let tasks = session.tasks();
    let planned = tasks.add_task("plan", Some("planning")).await.unwrap().unwrap();
    tasks.add_task("meet", Some("meetings")).await.unwrap();

    let removed = session
        .categories()
        .delete_category("planning")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed.name, "Planning");

    assert_eq!(tasks.tasks().len(), 2);
    let orphan = tasks.get_task(&planned).unwrap();
    assert_eq!(orphan.category_id.as_deref(), Some("planning"));
    assert!(session.categories().get_category("planning").is_none());
}

#[tokio::test]
async fn failed_seed_write_keeps_defaults_and_loads_tasks() {
    let backend = ScriptedBackend::new();
    backend.fail_next_write();
    let session = common::session(&backend);

    let err = session.load().await.unwrap_err();
    assert!(!err.is_fatal());
    assert!(matches!(
        err,
        StoreError::StorageWriteFailed {
            key: "categories",
            version: 1,
            ..
        }
    ));
    assert_eq!(session.categories().category_count(), 4);
    assert!(session.categories().is_loaded());
    assert!(session.tasks().is_loaded());
    assert!(backend.stored::<Vec<Category>>(CATEGORIES_KEY).is_none());

    let id = session
        .tasks()
        .add_task("still works", Some("planning"))
        .await
        .unwrap()
        .unwrap();
    assert!(session.tasks().get_task(&id).is_some());

    session.categories().add_category("Errands", None).await.unwrap();
    let stored: Vec<Category> = backend.stored(CATEGORIES_KEY).unwrap();
    assert_eq!(stored.len(), 5);
}

#[tokio::test]
async fn category_ids_reissued_after_restart_are_redrawn() {
    let backend = ScriptedBackend::new();
    for name in ["First", "Second"] {
        let session = loaded_session(&backend).await;
        session.categories().add_category(name, None).await.unwrap().unwrap();
    }

    let reloaded = loaded_session(&backend).await;
    let ids: Vec<String> = reloaded
        .categories()
        .categories()
        .iter()
        .skip(4)
        .map(|category| category.id.clone())
        .collect();
    assert_eq!(ids, vec!["id-1", "id-2"]);
}
