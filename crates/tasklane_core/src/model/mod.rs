//! Domain records managed by the entity stores.
//!
//! # Responsibility
//! - Define the task and category records persisted by the stores.
//! - Provide the `Entity` contract the generic store relies on.
//!
//! # Invariants
//! - Every record is identified by an opaque, non-empty string id.
//! - Text fields that identify a record to users are never empty after trim.

pub mod category;
pub mod task;

/// Record stored by an `EntityStore`.
///
/// Implementors are plain data: cloning must be cheap enough to rebuild a
/// snapshot on every mutation.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Stable identifier, unique within one collection.
    fn id(&self) -> &str;

    /// Checks record-level invariants before the record is accepted from
    /// persisted storage.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Validation failures for domain records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Record id is empty.
    EmptyId,
    /// Task title is empty after trim.
    EmptyTitle,
    /// Category name is empty after trim.
    EmptyName,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "record id must not be empty"),
            Self::EmptyTitle => write!(f, "task title must not be empty"),
            Self::EmptyName => write!(f, "category name must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trims user input and returns `None` when nothing is left.
pub(crate) fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
