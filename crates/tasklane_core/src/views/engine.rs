use super::task_view::{CategoryBreakdown, TaskStats, TaskView};
use crate::model::category::Category;
use crate::model::task::Task;
use crate::store::Snapshot;
use log::trace;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Memoizing front for task views.
///
/// Entries are keyed by `(tasks version, categories version)` plus the
/// filter; any version change drops every cached entry.
#[derive(Debug, Default)]
pub struct ViewEngine {
    cache: Mutex<ViewCache>,
    computations: AtomicU64,
}

#[derive(Debug, Default)]
struct ViewCache {
    versions: Option<(u64, u64)>,
    views: HashMap<Option<String>, Arc<TaskView>>,
    breakdown: Option<Arc<CategoryBreakdown>>,
}

impl ViewEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filtered, partitioned tasks for `filter`.
    pub fn task_view(
        &self,
        tasks: &Snapshot<Task>,
        categories: &Snapshot<Category>,
        filter: Option<&str>,
    ) -> Arc<TaskView> {
        let mut cache = self.current(tasks, categories);
        let key = filter.map(str::to_string);
        if let Some(view) = cache.views.get(&key) {
            return Arc::clone(view);
        }

        self.computations.fetch_add(1, Ordering::Relaxed);
        trace!(
            "event=view_compute module=views kind=task_view tasks_version={} categories_version={} filtered={}",
            tasks.version(),
            categories.version(),
            filter.is_some()
        );
        let view = Arc::new(TaskView::compute(tasks.records(), categories, filter));
        cache.views.insert(key, Arc::clone(&view));
        view
    }

    /// Tasks grouped by live category.
    pub fn breakdown(
        &self,
        tasks: &Snapshot<Task>,
        categories: &Snapshot<Category>,
    ) -> Arc<CategoryBreakdown> {
        let mut cache = self.current(tasks, categories);
        if let Some(breakdown) = &cache.breakdown {
            return Arc::clone(breakdown);
        }

        self.computations.fetch_add(1, Ordering::Relaxed);
        trace!(
            "event=view_compute module=views kind=breakdown tasks_version={} categories_version={}",
            tasks.version(),
            categories.version()
        );
        let breakdown = Arc::new(CategoryBreakdown::compute(
            tasks.records(),
            categories.records(),
        ));
        cache.breakdown = Some(Arc::clone(&breakdown));
        breakdown
    }

    /// Totals over all tasks, regardless of filter.
    pub fn stats(&self, tasks: &Snapshot<Task>, categories: &Snapshot<Category>) -> TaskStats {
        self.task_view(tasks, categories, None).stats()
    }

    /// Number of views computed since creation; cache hits do not count.
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    fn current(
        &self,
        tasks: &Snapshot<Task>,
        categories: &Snapshot<Category>,
    ) -> MutexGuard<'_, ViewCache> {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let versions = (tasks.version(), categories.version());
        if cache.versions != Some(versions) {
            cache.views.clear();
            cache.breakdown = None;
            cache.versions = Some(versions);
        }
        cache
    }
}
