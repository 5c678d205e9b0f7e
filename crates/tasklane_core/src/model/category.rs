//! Category record and first-run defaults.

use super::{Entity, ValidationError};
use serde::{Deserialize, Serialize};

/// Opaque category identifier.
pub type CategoryId = String;

/// A user-defined grouping for tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Display hint (for example `#004884`); never interpreted by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
        }
    }
}

impl Entity for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }
}

const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("planning", "Planning", "#004884"),
    ("execution", "Execution", "#0072C6"),
    ("reporting", "Reporting", "#00A3E0"),
    ("meetings", "Meetings", "#007A33"),
];

/// Categories installed the first time the store finds no persisted
/// collection. Ids are fixed so the seed is recognizable across devices.
pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(id, name, color)| Category::new(*id, *name, Some((*color).to_string())))
        .collect()
}
