//! Cache Engine Module
//!
//! Ties the entry table, the expiry scheduler and a `CacheStore` together.
//! Every mutation (explicit set or automatic eviction) is followed by a full
//! snapshot save so the durable copy tracks the live entry set.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::table::{CacheTable, Expiry};
use crate::cache::{wall_clock_now, CacheEntrySnapshot, CacheStats};
use crate::error::{CacheError, Result};
use crate::store::CacheStore;
use crate::tasks::{spawn_expiry_scheduler, ExpiryTicket};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// == Cache Event ==
/// Notifications about background activity, mostly for observing evictions
/// and failed saves that no caller would otherwise see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// An entry's window elapsed without access and it was removed
    Evicted { key: String },
    /// A snapshot with this many entries was written
    Persisted { entries: usize },
    /// A snapshot write failed; memory is still authoritative
    PersistFailed { reason: String },
}

// == Cache Engine ==
/// Sliding-expiration cache backed by snapshot persistence.
///
/// Cloning is cheap and every clone shares the same entries, so one engine
/// can be handed to many tasks. Background tasks stop once the last clone is
/// dropped.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    table: RwLock<CacheTable>,
    store: Arc<dyn CacheStore>,
    default_ttl: u64,
    /// Serializes saves; held until the blocking write has finished
    persist_lock: Arc<Mutex<()>>,
    scheduler: UnboundedSender<ExpiryTicket>,
    /// Deadlines currently held by the scheduler, at most one per key
    pending_expiries: Arc<AtomicUsize>,
    events: broadcast::Sender<CacheEvent>,
    saves: AtomicU64,
    persist_failures: AtomicU64,
}

impl CacheEngine {
    // == Constructor ==
    /// Opens an engine over `store`, reinstating still-valid entries.
    ///
    /// Each loaded entry whose age is below its own `ttl_seconds` gets a fresh
    /// window of that length starting now; older ones are dropped and will be
    /// missing from the next save. Must be called from within a tokio runtime.
    ///
    /// # Arguments
    /// * `store` - Where snapshots are loaded from and saved to
    /// * `default_ttl` - Window in seconds for entries stored with [`CacheEngine::set`]
    ///
    /// # Errors
    /// `InvalidRequest` for a zero TTL, `StoreUnavailable` if the store cannot
    /// be loaded. The engine never starts empty in place of a broken store.
    pub async fn open(store: Arc<dyn CacheStore>, default_ttl: u64) -> Result<Self> {
        validate_ttl(default_ttl)?;

        let loaded = {
            let store = Arc::clone(&store);
            run_blocking(move || store.load()).await?
        };

        let wall_now = wall_clock_now();
        let now = Instant::now();
        let mut table = CacheTable::new();
        let mut tickets = Vec::with_capacity(loaded.len());
        let mut discarded = 0usize;

        for snapshot in loaded {
            if snapshot.is_valid_at(wall_now) {
                tickets.extend(table.set(snapshot.key, snapshot.value, snapshot.ttl_seconds, now));
            } else {
                debug!("Dropping expired snapshot entry '{}'", snapshot.key);
                discarded += 1;
            }
        }

        info!(
            "Cache engine opened: reinstated={}, discarded={}, default_ttl={}s",
            table.len(),
            discarded,
            default_ttl
        );

        let (schedule_tx, schedule_rx) = mpsc::unbounded_channel();
        let (due_tx, due_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let pending_expiries = Arc::new(AtomicUsize::new(0));
        spawn_expiry_scheduler(schedule_rx, due_tx, Arc::clone(&pending_expiries));

        let inner = Arc::new(EngineInner {
            table: RwLock::new(table),
            store,
            default_ttl,
            persist_lock: Arc::new(Mutex::new(())),
            scheduler: schedule_tx,
            pending_expiries,
            events,
            saves: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
        });
        for ticket in tickets {
            inner.schedule(ticket);
        }
        spawn_eviction_worker(Arc::downgrade(&inner), due_rx);

        Ok(Self { inner })
    }

    // == Set ==
    /// Stores `value` under `key` with the engine's default TTL.
    ///
    /// See [`CacheEngine::set_with_ttl`].
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.set_with_ttl(key, value, self.inner.default_ttl).await
    }

    /// Stores `value` under `key` with a window of `ttl_seconds`.
    ///
    /// Overwrites any existing entry for `key` and restarts its window. Once
    /// memory is updated the full live set is saved before returning.
    ///
    /// # Errors
    /// `InvalidRequest` for a zero TTL (nothing is stored). `StoreUnavailable`
    /// if the save failed; the new value is still served from memory.
    pub async fn set_with_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl_seconds: u64,
    ) -> Result<()> {
        validate_ttl(ttl_seconds)?;

        let ticket = self
            .inner
            .table
            .write()
            .await
            .set(key.into(), value.into(), ttl_seconds, Instant::now());
        if let Some(ticket) = ticket {
            self.inner.schedule(ticket);
        }

        self.inner.persist().await.map(|_| ())
    }

    // == Get ==
    /// Returns the value for `key`, sliding its window forward on a hit.
    ///
    /// `None` means the key was never set, was evicted, or its window has
    /// already elapsed. It is a normal outcome, not an error. Nothing is sent
    /// to the scheduler; the pending ticket re-arms the entry when it fires.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.table.write().await.get(key, Instant::now())
    }

    // == Caching Data ==
    /// Returns the snapshot that would be persisted right now.
    ///
    /// Every live entry is stamped with the current time and its own TTL, so
    /// each save restarts the apparent age of all entries.
    pub async fn caching_data(&self) -> Vec<CacheEntrySnapshot> {
        self.inner.snapshot().await
    }

    // == Stats ==
    /// Returns lookup, eviction and persistence counters.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.inner.table.read().await.stats();
        stats.saves = self.inner.saves.load(Ordering::Relaxed);
        stats.persist_failures = self.inner.persist_failures.load(Ordering::Relaxed);
        stats.pending_expiries = self.inner.pending_expiries.load(Ordering::Relaxed);
        stats
    }

    /// Subscribes to eviction and persistence events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub fn default_ttl(&self) -> u64 {
        self.inner.default_ttl
    }

    /// Number of entries currently held, including any whose window elapsed
    /// moments ago and which are about to be evicted.
    pub async fn len(&self) -> usize {
        self.inner.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.table.read().await.is_empty()
    }
}

impl fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("default_ttl", &self.inner.default_ttl)
            .finish_non_exhaustive()
    }
}

impl EngineInner {
    fn schedule(&self, ticket: ExpiryTicket) {
        if self.scheduler.send(ticket).is_err() {
            warn!("Expiry scheduler is not running; entry will not be evicted automatically");
        }
    }

    async fn snapshot(&self) -> Vec<CacheEntrySnapshot> {
        self.table
            .read()
            .await
            .snapshot(wall_clock_now(), Instant::now())
    }

    // == Persist ==
    /// Saves the current live set.
    ///
    /// The snapshot is taken after the persistence lock is acquired, so it
    /// always includes the mutation that triggered this save. The lock moves
    /// into the blocking write and is released only when the write is done.
    async fn persist(&self) -> Result<usize> {
        let guard = Arc::clone(&self.persist_lock).lock_owned().await;
        let entries = self.snapshot().await;
        let count = entries.len();
        let store = Arc::clone(&self.store);

        let outcome = run_blocking(move || {
            let _guard = guard;
            store.save(&entries)
        })
        .await;

        match outcome {
            Ok(()) => {
                self.saves.fetch_add(1, Ordering::Relaxed);
                debug!("Persisted cache snapshot with {} entries", count);
                let _ = self.events.send(CacheEvent::Persisted { entries: count });
                Ok(count)
            }
            Err(err) => {
                self.persist_failures.fetch_add(1, Ordering::Relaxed);
                error!("Failed to persist cache snapshot: {}", err);
                let _ = self.events.send(CacheEvent::PersistFailed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    // == Expire ==
    /// Handles a due ticket from the scheduler.
    async fn expire(&self, ticket: ExpiryTicket) {
        let outcome = self.table.write().await.expire(&ticket.key, Instant::now());
        match outcome {
            Expiry::Evicted => {}
            Expiry::Rescheduled(next) => {
                self.schedule(next);
                return;
            }
            Expiry::Absent => return,
        }

        info!("Evicted expired key '{}'", ticket.key);
        let _ = self.events.send(CacheEvent::Evicted { key: ticket.key });

        // Failures are logged and broadcast by persist; memory stays correct
        let _ = self.persist().await;
    }
}

/// Spawns the task consuming due tickets from the scheduler.
///
/// Holds only a weak handle so an otherwise unused engine can be dropped.
fn spawn_eviction_worker(
    engine: Weak<EngineInner>,
    mut due: UnboundedReceiver<ExpiryTicket>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(ticket) = due.recv().await {
            let Some(inner) = engine.upgrade() else {
                break;
            };
            inner.expire(ticket).await;
        }
        debug!("Eviction worker stopped");
    })
}

fn validate_ttl(ttl_seconds: u64) -> Result<()> {
    if ttl_seconds == 0 {
        return Err(CacheError::InvalidRequest(
            "TTL must be at least one second".to_string(),
        ));
    }
    Ok(())
}

/// Runs a blocking store call on tokio's blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CacheError::Internal(format!("store task failed: {}", err)))?
}
