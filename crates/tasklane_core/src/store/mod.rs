//! In-memory entity stores mirrored to the persistence gateway.
//!
//! # Responsibility
//! - Hold ordered record collections and apply commands to them.
//! - Mirror every applied change to storage through a per-store FIFO queue.
//!
//! # Invariants
//! - Computing and installing a new snapshot never suspends.
//! - Persisted state converges to the most recent in-memory snapshot.
//! - Validation and not-found conditions never surface as errors.

use crate::model::Entity;
use crate::provider::IdProvider;
use crate::storage::StorageError;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod category_store;
pub mod entity_store;
pub mod task_store;

pub use category_store::CategoryStore;
pub use entity_store::{EntityStore, Mutation, Snapshot};
pub use task_store::TaskStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Why a command left the collection untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Title or name was empty after trim.
    EmptyText,
    /// No record with the requested id.
    NotFound,
    /// `clear_completed` found nothing to remove.
    NothingToClear,
    /// The id source kept returning ids already in the collection.
    IdCollision,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyText => "empty_text",
            Self::NotFound => "not_found",
            Self::NothingToClear => "nothing_to_clear",
            Self::IdCollision => "id_collision",
        }
    }
}

/// Draws an id that no record in `current` uses yet.
///
/// Gives up after `current.len() + 1` draws, which always suffices for a
/// source that never repeats itself.
pub(crate) fn fresh_id<T: Entity>(
    ids: &dyn IdProvider,
    current: &[T],
) -> Result<String, SkipReason> {
    let first = ids.next_id();
    if current.iter().all(|record| record.id() != first) {
        return Ok(first);
    }
    let taken: HashSet<&str> = current.iter().map(Entity::id).collect();
    (0..current.len())
        .map(|_| ids.next_id())
        .find(|id| !taken.contains(id.as_str()))
        .ok_or(SkipReason::IdCollision)
}

/// Store-level failures surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Storage could not be initialized; the store cannot serve reads.
    StorageInitFailed(StorageError),
    /// The persisted collection could not be read.
    StorageReadFailed {
        key: &'static str,
        source: StorageError,
    },
    /// A queued write failed. The in-memory snapshot was kept.
    StorageWriteFailed {
        key: &'static str,
        version: u64,
        source: StorageError,
    },
    /// The persisted collection violates record invariants.
    InvalidData { key: &'static str, message: String },
    /// Command issued before `load` completed.
    NotLoaded(&'static str),
}

impl StoreError {
    /// Non-fatal errors leave the store fully usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::StorageWriteFailed { .. })
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageInitFailed(err) => write!(f, "{err}"),
            Self::StorageReadFailed { key, source } => {
                write!(f, "failed to read `{key}`: {source}")
            }
            Self::StorageWriteFailed {
                key,
                version,
                source,
            } => write!(f, "failed to persist `{key}` at version {version}: {source}"),
            Self::InvalidData { key, message } => {
                write!(f, "invalid persisted `{key}` data: {message}")
            }
            Self::NotLoaded(key) => write!(f, "store `{key}` used before load"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageInitFailed(err) => Some(err),
            Self::StorageReadFailed { source, .. } => Some(source),
            Self::StorageWriteFailed { source, .. } => Some(source),
            Self::InvalidData { .. } | Self::NotLoaded(_) => None,
        }
    }
}
