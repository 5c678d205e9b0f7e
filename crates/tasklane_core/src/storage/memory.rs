use super::{KeyValueBackend, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Process-local backend. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    initialized: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw encoded text, bypassing the gateway. Used to seed state.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    /// Returns the raw encoded text under `key`, bypassing the gateway.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn initialize(&self) -> StorageResult<()> {
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(StorageError::NotInitialized);
        }
        Ok(self.raw(key))
    }

    async fn write(&self, key: &str, value: String) -> StorageResult<()> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(StorageError::NotInitialized);
        }
        self.lock().insert(key.to_string(), value);
        Ok(())
    }
}
