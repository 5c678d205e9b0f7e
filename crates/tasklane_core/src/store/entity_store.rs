//! Generic ordered record store with serialized persistence.
//!
//! # Responsibility
//! - Own the in-memory snapshot and version counter for one collection.
//! - Apply transforms atomically and queue the resulting snapshot for storage.
//! - Notify subscribers of every version change.
//!
//! # Invariants
//! - Snapshot replacement, version bump and queue append happen under one
//!   lock, so queue order equals version order.
//! - One drain task per store writes queued snapshots strictly in order; a
//!   failed write does not stop later ones.
//! - A declined transform changes nothing: no version bump, no write.

use super::{SkipReason, StoreError, StoreResult};
use crate::model::Entity;
use crate::storage::{PersistenceGateway, StorageError, StorageResult};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::future::{Future, IntoFuture};
use std::ops::Deref;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};

/// Immutable view of a collection at one version.
#[derive(Debug)]
pub struct Snapshot<T> {
    records: Arc<[T]>,
    version: u64,
}

impl<T> Snapshot<T> {
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Shared handle to the records; never copies them.
    pub fn records(&self) -> Arc<[T]> {
        Arc::clone(&self.records)
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            version: self.version,
        }
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.records
    }
}

/// Handle for one command issued against a store.
///
/// The in-memory effect is already visible when the handle is returned.
/// Awaiting it waits for the matching storage write:
/// - `Ok(Some(value))`: applied and persisted;
/// - `Ok(None)`: skipped (see `skip_reason`);
/// - `Err(StorageWriteFailed)`: applied in memory, write failed;
/// - `Err(NotLoaded)`: rejected, nothing changed.
#[must_use = "a mutation reports storage failures only when awaited"]
#[derive(Debug)]
pub struct Mutation<R> {
    key: &'static str,
    state: MutationState<R>,
}

#[derive(Debug)]
enum MutationState<R> {
    Applied {
        version: u64,
        value: R,
        write: oneshot::Receiver<StorageResult<()>>,
    },
    Skipped(SkipReason),
    Rejected(StoreError),
}

impl<R> Mutation<R> {
    pub fn is_applied(&self) -> bool {
        matches!(self.state, MutationState::Applied { .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self.state {
            MutationState::Skipped(reason) => Some(reason),
            _ => None,
        }
    }

    /// Store version produced by this mutation, when applied.
    pub fn version(&self) -> Option<u64> {
        match self.state {
            MutationState::Applied { version, .. } => Some(version),
            _ => None,
        }
    }

    /// Command result (new id, removed count, ...), when applied.
    pub fn value(&self) -> Option<&R> {
        match &self.state {
            MutationState::Applied { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Waits for the storage write issued by this mutation.
    pub async fn persisted(self) -> StoreResult<Option<R>> {
        match self.state {
            MutationState::Applied {
                version,
                value,
                write,
            } => {
                let outcome = write.await.unwrap_or_else(|_| {
                    Err(StorageError::Backend("write queue closed".to_string()))
                });
                match outcome {
                    Ok(()) => Ok(Some(value)),
                    Err(source) => Err(StoreError::StorageWriteFailed {
                        key: self.key,
                        version,
                        source,
                    }),
                }
            }
            MutationState::Skipped(_) => Ok(None),
            MutationState::Rejected(err) => Err(err),
        }
    }
}

impl<R: Send + 'static> IntoFuture for Mutation<R> {
    type Output = StoreResult<Option<R>>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.persisted())
    }
}

enum QueueItem<T> {
    Write {
        version: u64,
        records: Arc<[T]>,
        done: oneshot::Sender<StorageResult<()>>,
    },
    Barrier(oneshot::Sender<()>),
}

struct StoreState<T> {
    records: Arc<[T]>,
    version: u64,
    loaded: bool,
}

/// Ordered collection of `T` mirrored to storage under a fixed key.
///
/// Must be constructed inside a Tokio runtime: construction spawns the
/// store's write drain task, which exits once the store is dropped and the
/// queue is empty.
pub struct EntityStore<T: Entity> {
    key: &'static str,
    gateway: PersistenceGateway,
    seed: Option<fn() -> Vec<T>>,
    state: Mutex<StoreState<T>>,
    load_gate: tokio::sync::Mutex<bool>,
    queue: mpsc::UnboundedSender<QueueItem<T>>,
    versions: watch::Sender<u64>,
}

impl<T> EntityStore<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    /// Creates an unloaded store. `seed` supplies records when storage holds
    /// no collection under `key` yet.
    pub fn new(
        key: &'static str,
        gateway: PersistenceGateway,
        seed: Option<fn() -> Vec<T>>,
    ) -> Self {
        let (queue, pending) = mpsc::unbounded_channel();
        tokio::spawn(drain_writes(key, gateway.clone(), pending));
        let (versions, _) = watch::channel(0);

        Self {
            key,
            gateway,
            seed,
            state: Mutex::new(StoreState {
                records: Arc::from(Vec::new()),
                version: 0,
                loaded: false,
            }),
            load_gate: tokio::sync::Mutex::new(false),
            queue,
            versions,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Reads the persisted collection once.
    ///
    /// Later calls return immediately. When nothing is stored and the store
    /// has a seed, the seed is installed and written through the queue; a
    /// failure of that write is returned, but the store stays loaded.
    pub async fn load(&self) -> StoreResult<()> {
        let mut loaded = self.load_gate.lock().await;
        if *loaded {
            debug!(
                "event=store_load module=store key={} status=skip reason=already_loaded",
                self.key
            );
            return Ok(());
        }

        let started_at = Instant::now();
        info!("event=store_load module=store key={} status=start", self.key);

        if let Err(err) = self.gateway.initialize().await {
            error!(
                "event=store_load module=store key={} status=error error_code=storage_init_failed error={}",
                self.key, err
            );
            return Err(StoreError::StorageInitFailed(err));
        }

        let persisted: Option<Vec<T>> = self.gateway.get(self.key).await.map_err(|source| {
            error!(
                "event=store_load module=store key={} status=error error_code=storage_read_failed error={}",
                self.key, source
            );
            StoreError::StorageReadFailed {
                key: self.key,
                source,
            }
        })?;

        let seed_write = match (persisted, self.seed) {
            (Some(records), _) => {
                validate_collection(self.key, &records)?;
                self.install(records, false)
            }
            (None, Some(seed)) => self.install(seed(), true),
            (None, None) => self.install(Vec::new(), false),
        };
        *loaded = true;
        drop(loaded);

        let snapshot = self.snapshot();
        info!(
            "event=store_load module=store key={} status=ok count={} seeded={} duration_ms={}",
            self.key,
            snapshot.len(),
            seed_write.is_some(),
            started_at.elapsed().as_millis()
        );

        if let Some(mutation) = seed_write {
            mutation.persisted().await?;
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.lock_state().loaded
    }

    /// Current records and version. Never waits on storage.
    pub fn snapshot(&self) -> Snapshot<T> {
        let state = self.lock_state();
        Snapshot {
            records: Arc::clone(&state.records),
            version: state.version,
        }
    }

    pub fn version(&self) -> u64 {
        self.lock_state().version
    }

    /// Receiver that observes every version change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.versions.subscribe()
    }

    /// Applies `transform` to the current records.
    ///
    /// `transform` returns the next full collection plus a command result, or
    /// the reason it declined. It runs under the store lock and must not
    /// block.
    pub fn mutate<R, F>(&self, op: &'static str, transform: F) -> Mutation<R>
    where
        F: FnOnce(&[T]) -> Result<(Vec<T>, R), SkipReason>,
    {
        let mut state = self.lock_state();
        if !state.loaded {
            warn!(
                "event=store_mutate module=store key={} op={op} status=error error_code=not_loaded",
                self.key
            );
            return Mutation {
                key: self.key,
                state: MutationState::Rejected(StoreError::NotLoaded(self.key)),
            };
        }

        match transform(&state.records[..]) {
            Err(reason) => {
                debug!(
                    "event=store_mutate module=store key={} op={op} status=skip reason={}",
                    self.key,
                    reason.as_str()
                );
                Mutation {
                    key: self.key,
                    state: MutationState::Skipped(reason),
                }
            }
            Ok((next, value)) => {
                let write = self.replace_locked(&mut state, next, true);
                let version = state.version;
                debug!(
                    "event=store_mutate module=store key={} op={op} status=ok version={version} count={}",
                    self.key,
                    state.records.len()
                );
                Mutation {
                    key: self.key,
                    state: match write {
                        Some(write) => MutationState::Applied {
                            version,
                            value,
                            write,
                        },
                        None => MutationState::Rejected(StoreError::StorageWriteFailed {
                            key: self.key,
                            version,
                            source: StorageError::Backend("write queue closed".to_string()),
                        }),
                    },
                }
            }
        }
    }

    /// Waits until every write queued before this call has finished.
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        if self.queue.send(QueueItem::Barrier(done)).is_ok() {
            let _ = finished.await;
        }
    }

    fn install(&self, records: Vec<T>, persist: bool) -> Option<Mutation<()>> {
        let mut state = self.lock_state();
        state.loaded = true;
        let write = self.replace_locked(&mut state, records, persist)?;
        Some(Mutation {
            key: self.key,
            state: MutationState::Applied {
                version: state.version,
                value: (),
                write,
            },
        })
    }

    /// Swaps in `next`, bumps the version and, when `persist` is set, queues
    /// the write. Caller holds the state lock.
    fn replace_locked(
        &self,
        state: &mut StoreState<T>,
        next: Vec<T>,
        persist: bool,
    ) -> Option<oneshot::Receiver<StorageResult<()>>> {
        state.records = Arc::from(next);
        state.version += 1;
        self.versions.send_replace(state.version);

        if !persist {
            return None;
        }
        let (done, write) = oneshot::channel();
        let item = QueueItem::Write {
            version: state.version,
            records: Arc::clone(&state.records),
            done,
        };
        match self.queue.send(item) {
            Ok(()) => Some(write),
            Err(_) => {
                error!(
                    "event=store_enqueue module=store key={} status=error error_code=queue_closed version={}",
                    self.key, state.version
                );
                None
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState<T>> {
        // Transforms run before any field is touched, so a panic inside one
        // leaves the previous state intact.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Entity> std::fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

fn validate_collection<T: Entity>(key: &'static str, records: &[T]) -> StoreResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        record.validate().map_err(|err| StoreError::InvalidData {
            key,
            message: format!("record {index}: {err}"),
        })?;
        if !seen.insert(record.id()) {
            return Err(StoreError::InvalidData {
                key,
                message: format!("duplicate id `{}`", record.id()),
            });
        }
    }
    Ok(())
}

async fn drain_writes<T>(
    key: &'static str,
    gateway: PersistenceGateway,
    mut pending: mpsc::UnboundedReceiver<QueueItem<T>>,
) where
    T: Entity + Serialize,
{
    while let Some(item) = pending.recv().await {
        match item {
            QueueItem::Write {
                version,
                records,
                done,
            } => {
                let started_at = Instant::now();
                let outcome = gateway.set(key, &*records).await;
                match &outcome {
                    Ok(()) => debug!(
                        "event=store_write module=store key={key} status=ok version={version} count={} duration_ms={}",
                        records.len(),
                        started_at.elapsed().as_millis()
                    ),
                    Err(err) => warn!(
                        "event=store_write module=store key={key} status=error version={version} duration_ms={} error={}",
                        started_at.elapsed().as_millis(),
                        err
                    ),
                }
                // The issuer may have dropped its handle; the write still counts.
                let _ = done.send(outcome);
            }
            QueueItem::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
}
