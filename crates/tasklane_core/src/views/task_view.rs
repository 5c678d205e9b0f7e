use crate::model::category::Category;
use crate::model::task::Task;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Totals shown in the stats summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

/// Tasks matching one category filter, split by completion.
///
/// Holds indices into the shared task snapshot it was computed from.
#[derive(Debug)]
pub struct TaskView {
    tasks: Arc<[Task]>,
    filter: Option<String>,
    filtered: Vec<usize>,
    pending: Vec<usize>,
    completed: Vec<usize>,
}

impl TaskView {
    /// Computes the view. `filter = None` selects every task; otherwise only
    /// tasks whose live category equals `filter`.
    pub fn compute(tasks: Arc<[Task]>, categories: &[Category], filter: Option<&str>) -> Self {
        let live = LiveCategories::new(categories);
        let filtered: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| match filter {
                None => true,
                Some(wanted) => live.effective(task) == Some(wanted),
            })
            .map(|(index, _)| index)
            .collect();
        let (completed, pending): (Vec<usize>, Vec<usize>) = filtered
            .iter()
            .copied()
            .partition(|index| tasks[*index].completed);

        Self {
            filter: filter.map(str::to_string),
            tasks,
            filtered,
            pending,
            completed,
        }
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn filtered(&self) -> impl Iterator<Item = &Task> + '_ {
        self.filtered.iter().map(|index| &self.tasks[*index])
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> + '_ {
        self.pending.iter().map(|index| &self.tasks[*index])
    }

    pub fn completed(&self) -> impl Iterator<Item = &Task> + '_ {
        self.completed.iter().map(|index| &self.tasks[*index])
    }

    pub fn total_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats {
            total: self.total_count(),
            pending: self.pending_count(),
            completed: self.completed_count(),
        }
    }
}

/// One category (or the uncategorized bucket) with its tasks.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    /// Index into the category snapshot; `None` for uncategorized.
    category: Option<usize>,
    tasks: Vec<usize>,
}

/// All tasks grouped by live category, in category order, with the
/// uncategorized group last when it has members.
#[derive(Debug)]
pub struct CategoryBreakdown {
    tasks: Arc<[Task]>,
    categories: Arc<[Category]>,
    groups: Vec<TaskGroup>,
}

impl CategoryBreakdown {
    pub fn compute(tasks: Arc<[Task]>, categories: Arc<[Category]>) -> Self {
        let mut by_category: HashMap<&str, usize> = HashMap::with_capacity(categories.len());
        let mut groups: Vec<TaskGroup> = categories
            .iter()
            .enumerate()
            .map(|(index, category)| {
                by_category.insert(category.id.as_str(), index);
                TaskGroup {
                    category: Some(index),
                    tasks: Vec::new(),
                }
            })
            .collect();
        let mut uncategorized = TaskGroup {
            category: None,
            tasks: Vec::new(),
        };

        for (task_index, task) in tasks.iter().enumerate() {
            let group = task
                .category_id
                .as_deref()
                .and_then(|id| by_category.get(id).copied());
            match group {
                Some(group) => groups[group].tasks.push(task_index),
                None => uncategorized.tasks.push(task_index),
            }
        }
        if !uncategorized.tasks.is_empty() {
            groups.push(uncategorized);
        }

        Self {
            tasks,
            categories,
            groups,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates `(category, tasks)`; `category` is `None` for uncategorized.
    pub fn groups(&self) -> impl Iterator<Item = (Option<&Category>, Vec<&Task>)> + '_ {
        self.groups.iter().map(|group| {
            let category = group.category.map(|index| &self.categories[index]);
            let tasks = group.tasks.iter().map(|index| &self.tasks[*index]).collect();
            (category, tasks)
        })
    }

    /// Number of tasks whose live category is `category_id`.
    pub fn count_for(&self, category_id: &str) -> usize {
        self.groups
            .iter()
            .find(|group| {
                group
                    .category
                    .is_some_and(|index| self.categories[index].id == category_id)
            })
            .map_or(0, |group| group.tasks.len())
    }

    pub fn uncategorized_count(&self) -> usize {
        self.groups
            .iter()
            .find(|group| group.category.is_none())
            .map_or(0, |group| group.tasks.len())
    }
}

struct LiveCategories<'a> {
    ids: HashSet<&'a str>,
}

impl<'a> LiveCategories<'a> {
    fn new(categories: &'a [Category]) -> Self {
        Self {
            ids: categories.iter().map(|category| category.id.as_str()).collect(),
        }
    }

    /// Category the task is displayed under; dangling references map to none.
    fn effective<'t>(&self, task: &'t Task) -> Option<&'t str> {
        task.category_id
            .as_deref()
            .filter(|id| self.ids.contains(*id))
    }
}
