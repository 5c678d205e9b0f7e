//! Task commands over the generic entity store.
//!
//! # Invariants
//! - New tasks start pending, with a trimmed non-empty title.
//! - `clear_completed` is one mutation: one version bump, one write.

use super::entity_store::{EntityStore, Mutation, Snapshot};
use super::{fresh_id, SkipReason, StoreResult};
use crate::model::category::CategoryId;
use crate::model::normalize_text;
use crate::model::task::{Task, TaskId};
use crate::provider::{Clock, IdProvider};
use crate::storage::{PersistenceGateway, TASKS_KEY};
use std::sync::Arc;
use tokio::sync::watch;

/// Store for the `tasks` collection.
pub struct TaskStore {
    entities: EntityStore<Task>,
    ids: Arc<dyn IdProvider>,
    clock: Arc<dyn Clock>,
}

impl TaskStore {
    pub fn new(
        gateway: PersistenceGateway,
        ids: Arc<dyn IdProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entities: EntityStore::new(TASKS_KEY, gateway, None),
            ids,
            clock,
        }
    }

    /// Loads persisted tasks; an absent collection loads as empty.
    pub async fn load(&self) -> StoreResult<()> {
        self.entities.load().await
    }

    pub fn is_loaded(&self) -> bool {
        self.entities.is_loaded()
    }

    pub fn tasks(&self) -> Arc<[Task]> {
        self.entities.snapshot().records()
    }

    pub fn snapshot(&self) -> Snapshot<Task> {
        self.entities.snapshot()
    }

    pub fn version(&self) -> u64 {
        self.entities.version()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.entities.subscribe()
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.entities
            .snapshot()
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    /// Appends a pending task. Whitespace-only titles are skipped.
    ///
    /// An empty `category_id` is treated as no category.
    pub fn add_task(&self, title: &str, category_id: Option<&str>) -> Mutation<TaskId> {
        let category_id: Option<CategoryId> = category_id.and_then(normalize_text);
        self.entities.mutate("add_task", |current| {
            let title = normalize_text(title).ok_or(SkipReason::EmptyText)?;
            let id = fresh_id(&*self.ids, current)?;
            let task = Task::new(id, title, self.clock.now_ms(), category_id);
            let id = task.id.clone();

            let mut next = current.to_vec();
            next.push(task);
            Ok((next, id))
        })
    }

    /// Flips `completed`; the mutation value is the new state.
    pub fn toggle_task(&self, id: &str) -> Mutation<bool> {
        self.entities.mutate("toggle_task", |current| {
            let index = position(current, id)?;
            let mut next = current.to_vec();
            next[index] = current[index].toggled();
            let completed = next[index].completed;
            Ok((next, completed))
        })
    }

    /// Removes one task; the mutation value is the removed record.
    pub fn delete_task(&self, id: &str) -> Mutation<Task> {
        self.entities.mutate("delete_task", |current| {
            let index = position(current, id)?;
            let mut next = current.to_vec();
            let removed = next.remove(index);
            Ok((next, removed))
        })
    }

    /// Removes every completed task at once; the value is the removed count.
    pub fn clear_completed(&self) -> Mutation<usize> {
        self.entities.mutate("clear_completed", |current| {
            let next: Vec<Task> = current.iter().filter(|task| !task.completed).cloned().collect();
            let removed = current.len() - next.len();
            if removed == 0 {
                return Err(SkipReason::NothingToClear);
            }
            Ok((next, removed))
        })
    }

    /// Waits for every write issued so far.
    pub async fn flush(&self) {
        self.entities.flush().await;
    }
}

fn position(tasks: &[Task], id: &str) -> Result<usize, SkipReason> {
    tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or(SkipReason::NotFound)
}
