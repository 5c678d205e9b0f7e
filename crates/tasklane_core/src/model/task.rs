//! Task record.
//!
//! # Invariants
//! - `title` is trimmed and non-empty.
//! - `category_id` may dangle once its category is deleted; readers treat a
//!   dangling reference as uncategorized.

use super::category::CategoryId;
use super::{Entity, ValidationError};
use serde::{Deserialize, Serialize};

/// Opaque task identifier.
pub type TaskId = String;

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

impl Task {
    /// Builds a pending task. `title` is expected to be normalized already.
    pub fn new(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        created_at: i64,
        category_id: Option<CategoryId>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed: false,
            created_at,
            category_id,
        }
    }

    /// Returns a copy with `completed` flipped.
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }
}

impl Entity for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }
}
