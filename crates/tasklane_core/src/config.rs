//! Runtime configuration for opening a session.
//!
//! # Responsibility
//! - Describe where data lives and how logging is set up.
//! - Resolve settings from the process environment with safe defaults.

use crate::logging::default_log_level;
use std::path::PathBuf;

/// Environment variable selecting the database file (`:memory:` for none).
pub const DB_PATH_ENV: &str = "TASKLANE_DB_PATH";
/// Environment variable selecting the log level.
pub const LOG_LEVEL_ENV: &str = "TASKLANE_LOG_LEVEL";
/// Environment variable selecting the absolute log directory.
pub const LOG_DIR_ENV: &str = "TASKLANE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "tasklane.sqlite3";
const MEMORY_LOCATION: &str = ":memory:";

/// Where the persistence gateway keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// SQLite database file.
    File(PathBuf),
    /// Nothing survives the process.
    Memory,
}

impl StorageLocation {
    /// Parses a user-supplied location; `:memory:` selects `Memory`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "" => None,
            MEMORY_LOCATION => Some(Self::Memory),
            path => Some(Self::File(PathBuf::from(path))),
        }
    }
}

impl Default for StorageLocation {
    fn default() -> Self {
        Self::File(std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
    }
}

/// Settings consumed by `Session::open` and `init_logging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub storage: StorageLocation,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageLocation::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Config with an in-memory store and logging off.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageLocation::Memory,
            ..Self::default()
        }
    }

    /// Reads `TASKLANE_*` variables, falling back to defaults for missing or
    /// blank values.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            storage: non_blank(DB_PATH_ENV)
                .and_then(|raw| StorageLocation::parse(&raw))
                .unwrap_or(defaults.storage),
            log_level: non_blank(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: non_blank(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}
