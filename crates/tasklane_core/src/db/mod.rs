//! SQLite bootstrap for the on-device key/value table.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No key/value access happens before bootstrap succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Why a database could not be made ready for `SqliteBackend`.
#[derive(Debug)]
pub enum BootstrapError {
    /// Opening, configuring or migrating the connection failed.
    Engine(rusqlite::Error),
    /// The file was written by a newer build; it is left untouched.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "sqlite bootstrap failed: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "kv schema version {found} is newer than supported {supported}"
            ),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for BootstrapError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Engine(value)
    }
}
