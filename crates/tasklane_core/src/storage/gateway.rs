use super::{KeyValueBackend, StorageResult};
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Shared handle over one storage backend.
///
/// Cloning is cheap; all clones share the backend and the readiness gate, so
/// the task and category stores can sit on the same gateway.
#[derive(Clone)]
pub struct PersistenceGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    backend: Arc<dyn KeyValueBackend>,
    ready: OnceCell<StorageResult<()>>,
}

impl PersistenceGateway {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                backend,
                ready: OnceCell::new(),
            }),
        }
    }

    /// Runs backend setup once and returns its cached outcome.
    ///
    /// Concurrent callers wait on the same in-flight setup. A failure is
    /// cached too: recovering requires a new gateway.
    pub async fn initialize(&self) -> StorageResult<()> {
        self.inner
            .ready
            .get_or_init(|| async {
                let started_at = Instant::now();
                info!("event=storage_init module=storage status=start");
                let outcome = self.inner.backend.initialize().await;
                match &outcome {
                    Ok(()) => info!(
                        "event=storage_init module=storage status=ok duration_ms={}",
                        started_at.elapsed().as_millis()
                    ),
                    Err(err) => error!(
                        "event=storage_init module=storage status=error duration_ms={} error={}",
                        started_at.elapsed().as_millis(),
                        err
                    ),
                }
                outcome
            })
            .await
            .clone()
    }

    /// Whether `initialize` has completed successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.ready.get(), Some(Ok(())))
    }

    /// Reads and decodes the value stored under `key`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        self.initialize().await?;
        match self.inner.backend.read(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores `value` under `key`, replacing any previous value.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.initialize().await?;
        let raw = serde_json::to_string(value)?;
        self.inner.backend.write(key, raw).await
    }
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("ready", &self.inner.ready.get())
            .finish_non_exhaustive()
    }
}
