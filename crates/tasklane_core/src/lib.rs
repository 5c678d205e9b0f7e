//! Core of Tasklane: a local-first task and category manager.
//! This crate owns every store invariant; UI shells only issue commands and
//! read snapshots and views.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod provider;
pub mod session;
pub mod storage;
pub mod store;
pub mod views;

pub use config::{CoreConfig, StorageLocation, DB_PATH_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::category::{default_categories, Category, CategoryId};
pub use model::task::{Task, TaskId};
pub use model::{Entity, ValidationError};
pub use provider::{
    Clock, FixedClock, IdProvider, SequentialIdProvider, SystemClock, UuidIdProvider,
};
pub use session::Session;
pub use storage::{
    KeyValueBackend, MemoryBackend, PersistenceGateway, SqliteBackend, StorageError,
    StorageResult, CATEGORIES_KEY, TASKS_KEY,
};
pub use store::{
    CategoryStore, EntityStore, Mutation, SkipReason, Snapshot, StoreError, StoreResult,
    TaskStore,
};
pub use views::{
    delete_category_prompt, CategoryBreakdown, TaskStats, TaskView, ViewEngine,
    UNCATEGORIZED_LABEL,
};

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
