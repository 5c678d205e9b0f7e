//! Process-level container for the stores and their views.
//!
//! # Responsibility
//! - Build one gateway and both stores from configuration.
//! - Offer the read accessors the presentation layer consumes.
//!
//! # Invariants
//! - Both stores share one gateway, under distinct keys.
//! - A session returned by `open` has both stores loaded.

use crate::config::{CoreConfig, StorageLocation};
use crate::model::category::Category;
use crate::model::task::Task;
use crate::provider::{Clock, IdProvider, SystemClock, UuidIdProvider};
use crate::storage::{KeyValueBackend, MemoryBackend, PersistenceGateway, SqliteBackend};
use crate::store::{CategoryStore, StoreResult, TaskStore};
use crate::views::{delete_category_prompt, CategoryBreakdown, TaskStats, TaskView, ViewEngine};
use log::{info, warn};
use std::sync::Arc;

/// Task and category stores plus a shared view cache.
pub struct Session {
    gateway: PersistenceGateway,
    tasks: TaskStore,
    categories: CategoryStore,
    views: ViewEngine,
}

impl Session {
    /// Opens storage from `config` and loads both stores.
    ///
    /// Only fatal load errors fail the open; a failed seed write is logged
    /// and the session is returned with its in-memory defaults.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn open(config: &CoreConfig) -> StoreResult<Self> {
        let backend: Arc<dyn KeyValueBackend> = match &config.storage {
            StorageLocation::File(path) => Arc::new(SqliteBackend::file(path.clone())),
            StorageLocation::Memory => Arc::new(MemoryBackend::new()),
        };
        info!(
            "event=session_open module=session status=start storage={}",
            match config.storage {
                StorageLocation::File(_) => "file",
                StorageLocation::Memory => "memory",
            }
        );

        let session = Self::with_gateway(
            PersistenceGateway::new(backend),
            Arc::new(UuidIdProvider),
            Arc::new(SystemClock),
        );
        match session.load().await {
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!("event=session_open module=session status=degraded error={err}");
                Ok(session)
            }
            Ok(()) => Ok(session),
        }
    }

    /// Builds unloaded stores over `gateway` with injected id and time sources.
    pub fn with_gateway(
        gateway: PersistenceGateway,
        ids: Arc<dyn IdProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks: TaskStore::new(gateway.clone(), Arc::clone(&ids), clock),
            categories: CategoryStore::new(gateway.clone(), ids),
            gateway,
            views: ViewEngine::new(),
        }
    }

    /// Loads categories first so seeded defaults exist before tasks render.
    ///
    /// A failed seed write does not stop the task store from loading; it is
    /// returned after both stores are loaded and usable.
    pub async fn load(&self) -> StoreResult<()> {
        let categories = match self.categories.load().await {
            Err(err) if err.is_fatal() => return Err(err),
            outcome => outcome,
        };
        self.tasks.load().await?;
        info!(
            "event=session_open module=session status=ok tasks={} categories={} degraded={}",
            self.tasks.snapshot().len(),
            self.categories.snapshot().len(),
            categories.is_err()
        );
        categories
    }

    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn views(&self) -> &ViewEngine {
        &self.views
    }

    /// Current task view for `filter` (`None` = all tasks).
    pub fn task_view(&self, filter: Option<&str>) -> Arc<TaskView> {
        self.views
            .task_view(&self.tasks.snapshot(), &self.categories.snapshot(), filter)
    }

    pub fn breakdown(&self) -> Arc<CategoryBreakdown> {
        self.views
            .breakdown(&self.tasks.snapshot(), &self.categories.snapshot())
    }

    pub fn stats(&self) -> TaskStats {
        self.views
            .stats(&self.tasks.snapshot(), &self.categories.snapshot())
    }

    /// Confirmation text for deleting `category_id`, or `None` if it is gone.
    pub fn delete_category_prompt(&self, category_id: &str) -> Option<String> {
        let category: Category = self.categories.get_category(category_id)?;
        let affected = self.breakdown().count_for(category_id);
        Some(delete_category_prompt(&category.name, affected))
    }

    /// Tasks shown under `category_id`, or uncategorized when `None`.
    pub fn tasks_in_group(&self, category_id: Option<&str>) -> Vec<Task> {
        let breakdown = self.breakdown();
        let tasks = breakdown
            .groups()
            .find(|(category, _)| category.map(|c| c.id.as_str()) == category_id)
            .map(|(_, tasks)| tasks.into_iter().cloned().collect())
            .unwrap_or_default();
        tasks
    }

    /// Waits for every queued write on both stores.
    pub async fn flush(&self) {
        self.categories.flush().await;
        self.tasks.flush().await;
    }
}
