mod common;

use common::{loaded_session, ScriptedBackend};
use std::sync::Arc;
use tasklane_core::{Session, TaskStats};

async fn seeded() -> (Arc<ScriptedBackend>, Session) {
    let backend = ScriptedBackend::new();
    let session = loaded_session(&backend).await;
    let tasks = session.tasks();
    let plan = tasks.add_task("plan", Some("planning")).await.unwrap().unwrap();
    tasks.add_task("plan more", Some("planning")).await.unwrap();
    tasks.add_task("meet", Some("meetings")).await.unwrap();
    tasks.add_task("loose", None).await.unwrap();
    tasks.toggle_task(&plan).await.unwrap();
    (backend, session)
}

fn titles<'a>(tasks: impl Iterator<Item = &'a tasklane_core::Task>) -> Vec<&'a str> {
    tasks.map(|task| task.title.as_str()).collect()
}

#[tokio::test]
async fn unfiltered_view_partitions_all_tasks() {
    let (_backend, session) = seeded().await;
    let view = session.task_view(None);

    assert_eq!(view.filter(), None);
    assert_eq!(view.total_count(), 4);
    assert_eq!(titles(view.completed()), vec!["plan"]);
    assert_eq!(titles(view.pending()), vec!["plan more", "meet", "loose"]);
    assert_eq!(
        session.stats(),
        TaskStats {
            total: 4,
            pending: 3,
            completed: 1
        }
    );
}

#[tokio::test]
async fn category_filter_selects_matching_tasks() {
    let (_backend, session) = seeded().await;
    let view = session.task_view(Some("planning"));

    assert_eq!(titles(view.filtered()), vec!["plan", "plan more"]);
    assert_eq!(view.pending_count(), 1);
    assert_eq!(view.completed_count(), 1);
    assert_eq!(session.task_view(Some("execution")).total_count(), 0);
}

#[tokio::test]
async fn deleted_category_tasks_become_uncategorized() {
    let (_backend, session) = seeded().await;
    session.categories().delete_category("planning").await.unwrap();

    assert_eq!(session.task_view(Some("planning")).total_count(), 0);
    assert_eq!(session.task_view(None).total_count(), 4);

    let breakdown = session.breakdown();
    assert_eq!(breakdown.count_for("planning"), 0);
    assert_eq!(breakdown.uncategorized_count(), 3);
    assert_eq!(
        titles(session.tasks_in_group(None).iter()),
        vec!["plan", "plan more", "loose"]
    );
}

#[tokio::test]
async fn breakdown_follows_category_order_with_uncategorized_last() {
    let (_backend, session) = seeded().await;
    let breakdown = session.breakdown();

    let shape: Vec<(Option<String>, usize)> = breakdown
        .groups()
        .map(|(category, tasks)| (category.map(|c| c.id.clone()), tasks.len()))
        .collect();
    assert_eq!(
        shape,
        vec![
            (Some("planning".to_string()), 2),
            (Some("execution".to_string()), 0),
            (Some("reporting".to_string()), 0),
            (Some("meetings".to_string()), 1),
            (None, 1),
        ]
    );
}

#[tokio::test]
async fn views_are_memoized_per_version_and_filter() {
    let (_backend, session) = seeded().await;
    let engine = session.views();

    let first = session.task_view(None);
    let again = session.task_view(None);
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(engine.computations(), 1);

    let filtered = session.task_view(Some("meetings"));
    assert!(!Arc::ptr_eq(&first, &filtered));
    assert!(Arc::ptr_eq(&filtered, &session.task_view(Some("meetings"))));
    assert_eq!(engine.computations(), 2);

    session.tasks().add_task("new", None).await.unwrap();
    let refreshed = session.task_view(None);
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(refreshed.total_count(), 5);
    assert_eq!(engine.computations(), 3);

    session.categories().add_category("Fresh", None).await.unwrap();
    let after_category_change = session.task_view(None);
    assert!(!Arc::ptr_eq(&refreshed, &after_category_change));
}

#[tokio::test]
async fn held_view_is_unaffected_by_later_mutations() {
    let (_backend, session) = seeded().await;
    let before = session.task_view(None);

    session.tasks().clear_completed().await.unwrap();

    assert_eq!(before.total_count(), 4);
    assert_eq!(session.task_view(None).total_count(), 3);
}

#[tokio::test]
async fn delete_prompt_reports_reassignment_count() {
    let (_backend, session) = seeded().await;

    let prompt = session.delete_category_prompt("planning").unwrap();
    assert_eq!(
        prompt,
        "Are you sure you want to delete \"Planning\"? Its 2 tasks will be kept and moved to Uncategorized."
    );
    assert_eq!(
        session.delete_category_prompt("reporting").unwrap(),
        "Are you sure you want to delete \"Reporting\"?"
    );
    assert!(session.delete_category_prompt("missing").is_none());
}

#[tokio::test]
async fn group_lookup_returns_owned_tasks() {
    let (_backend, session) = seeded().await;

    let planning = session.tasks_in_group(Some("planning"));
    assert_eq!(titles(planning.iter()), vec!["plan", "plan more"]);
    assert_eq!(titles(session.tasks_in_group(None).iter()), vec!["loose"]);
    assert!(session.tasks_in_group(Some("reporting")).is_empty());
    assert!(session.tasks_in_group(Some("gone")).is_empty());
}
