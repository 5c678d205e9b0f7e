//! Persistence gateway and key/value backends.
//!
//! # Responsibility
//! - Provide async `get`/`set` of whole collections under fixed keys.
//! - Gate every access behind a one-time, cached initialization.
//!
//! # Invariants
//! - A backend is initialized at most once per gateway, whatever the outcome.
//! - Individual read/write failures are reported, never retried here.
//!
//! # See also
//! - `store::entity_store` for write ordering guarantees.

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod gateway;
mod memory;
mod sqlite;

pub use gateway::PersistenceGateway;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Storage key holding the task collection.
pub const TASKS_KEY: &str = "tasks";
/// Storage key holding the category collection.
pub const CATEGORIES_KEY: &str = "categories";

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a backend or by value encoding.
///
/// Cloneable so a cached initialization outcome can be handed to every
/// caller that awaits readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend setup failed; the gateway stays unusable.
    Init(String),
    /// A read or write reached the backend and failed.
    Backend(String),
    /// Stored text could not be encoded or decoded.
    Codec(String),
    /// Backend accessed before `initialize` completed.
    NotInitialized,
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init(message) => write!(f, "storage initialization failed: {message}"),
            Self::Backend(message) => write!(f, "storage operation failed: {message}"),
            Self::Codec(message) => write!(f, "stored value encoding error: {message}"),
            Self::NotInitialized => write!(f, "storage accessed before initialization"),
        }
    }
}

impl Error for StorageError {}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value.to_string())
    }
}

/// Raw key/value backend driven by `PersistenceGateway`.
///
/// Values are opaque encoded text; the gateway owns encoding.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// One-time setup. Called at most once by the gateway.
    async fn initialize(&self) -> StorageResult<()>;

    async fn read(&self, key: &str) -> StorageResult<Option<String>>;

    async fn write(&self, key: &str, value: String) -> StorageResult<()>;
}
