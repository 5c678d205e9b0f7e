//! Derived, memoized projections over store snapshots.
//!
//! # Responsibility
//! - Compute filtered / partitioned / grouped task views and counts.
//! - Cache results per store versions and filter.
//!
//! # Invariants
//! - Views are pure functions of (tasks, categories, filter).
//! - A task whose category no longer exists is uncategorized.
//! - Views share snapshot storage through `Arc`; they never own copies.

mod engine;
mod prompt;
mod task_view;

pub use engine::ViewEngine;
pub use prompt::{delete_category_prompt, UNCATEGORIZED_LABEL};
pub use task_view::{CategoryBreakdown, TaskGroup, TaskStats, TaskView};
