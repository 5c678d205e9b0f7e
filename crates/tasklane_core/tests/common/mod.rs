#![allow(dead_code)]

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tasklane_core::{
    FixedClock, KeyValueBackend, MemoryBackend, PersistenceGateway, SequentialIdProvider,
    Session, StorageError, StorageResult,
};
use tokio::sync::{oneshot, Notify};

pub const NOW_MS: i64 = 1_700_000_000_000;

/// Memory backend with knobs for delaying and failing operations.
#[derive(Default)]
pub struct ScriptedBackend {
    inner: MemoryBackend,
    fail_init: bool,
    fail_next_write: AtomicBool,
    init_calls: AtomicUsize,
    write_calls: AtomicUsize,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    held: Notify,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_init() -> Arc<Self> {
        Arc::new(Self {
            fail_init: true,
            ..Self::default()
        })
    }

    /// Blocks the next write until the returned sender fires.
    pub fn hold_next_write(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(gate);
        release
    }

    /// Resolves once a held write has started.
    pub async fn wait_until_held(&self) {
        self.held.notified().await;
    }

    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn seed_raw(&self, key: &str, value: &str) {
        self.inner.insert_raw(key, value);
    }

    pub fn stored<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner
            .raw(key)
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

#[async_trait]
impl KeyValueBackend for ScriptedBackend {
    async fn initialize(&self) -> StorageResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(StorageError::Init("disk unavailable".to_string()));
        }
        self.inner.initialize().await
    }

    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: String) -> StorageResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            self.held.notify_one();
            let _ = gate.await;
        }
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        self.inner.write(key, value).await
    }
}

pub fn gateway(backend: &Arc<ScriptedBackend>) -> PersistenceGateway {
    PersistenceGateway::new(Arc::clone(backend) as Arc<dyn KeyValueBackend>)
}

/// Unloaded session with deterministic ids (`id-1`, `id-2`, ...) and clock.
pub fn session(backend: &Arc<ScriptedBackend>) -> Session {
    Session::with_gateway(
        gateway(backend),
        Arc::new(SequentialIdProvider::new("id")),
        Arc::new(FixedClock(NOW_MS)),
    )
}

pub async fn loaded_session(backend: &Arc<ScriptedBackend>) -> Session {
    let session = session(backend);
    session.load().await.unwrap();
    session
}
