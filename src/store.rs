// The store engine: ties the mmap region, codec, index manager, and
// statistics together into the public CRUD + search + lifecycle API.
//
// Load-then-swap at construction and dirty-gated sync mirror the teacher's
// "never publish partial state" discipline from its primary index loader;
// the graceful-shutdown handshake and lazy-TTL-cleanup channel are this
// crate's own extensions of that discipline to an owned background task.

use crate::codec;
use crate::config::StoreOptions;
use crate::error::Result;
use crate::index_manager::IndexManager;
use crate::mmap_region::MmapRegion;
use crate::observability::{log_operation, Operation};
use crate::search::{self, SearchQuery, SearchResult};
use crate::statistics::{Stats, StatsSnapshot};
use crate::types::{now_secs, Entry, IndexType, Value, ValidatedKey};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Inner {
    path: PathBuf,
    opts: StoreOptions,
    region: MmapRegion,
    documents: BTreeMap<String, Entry>,
    dirty: bool,
}

/// A memory-mapped key/value store with pluggable per-field search indexes.
///
/// Cloning a `Store` is cheap and shares the same underlying state (it is
/// itself an `Arc`-like handle); the HTTP surface hands one clone to every
/// axum worker.
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<Inner>>,
    index_manager: Arc<IndexManager>,
    stats: Arc<Stats>,
    expired_tx: mpsc::Sender<String>,
    shutdown_tx: watch::Sender<bool>,
    background: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl Store {
    /// Open (creating if absent) the store file at `path`, loading any
    /// existing content and rebuilding every configured index before
    /// returning. A background task performing periodic sync and TTL GC is
    /// spawned before this returns.
    pub async fn new(path: impl AsRef<Path>, opts: StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let region = MmapRegion::open(&path, opts.initial_size)?;
        let index_manager = Arc::new(IndexManager::new());

        let documents = if region.content_size() == 0 {
            BTreeMap::new()
        } else {
            let decoded = codec::decode(region.content_bytes())?;
            let now = now_secs();
            for (key, entry) in decoded.iter() {
                if !entry.is_expired_at(now) {
                    index_manager.update(key, &entry.value);
                }
            }
            decoded
        };

        info!(path = %path.display(), entries = documents.len(), "store opened");
        log_operation(
            &Operation::Startup {
                db_path: path.display().to_string(),
            },
            &Ok(()),
        );

        let inner = Arc::new(RwLock::new(Inner {
            path,
            opts: opts.clone(),
            region,
            documents,
            dirty: false,
        }));

        let stats = Arc::new(Stats::new());
        let (expired_tx, expired_rx) = mpsc::channel(1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_background_task(
            inner.clone(),
            index_manager.clone(),
            stats.clone(),
            expired_rx,
            shutdown_rx,
            opts.sync_interval,
        ));

        Ok(Self {
            inner,
            index_manager,
            stats,
            expired_tx,
            shutdown_tx,
            background: Arc::new(std::sync::Mutex::new(Some(handle))),
        })
    }

    /// The current entry for `key`, or `None` if absent or expired.
    /// An expired entry is reported as absent immediately and its removal
    /// is scheduled on the background task rather than performed inline.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = ValidatedKey::new(key)?;
        let start = Instant::now();
        let guard = self.inner.read().await;
        let result = match guard.documents.get(key.as_str()) {
            Some(entry) if entry.is_expired() => {
                let _ = self.expired_tx.try_send(key.as_str().to_string());
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        };
        drop(guard);
        self.stats.record_get(start.elapsed());
        log_operation(
            &Operation::Get {
                key: key.into_string(),
                found: result.is_some(),
            },
            &Ok(()),
        );
        Ok(result)
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_entry(key, Entry::new(value)).await
    }

    pub async fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.set_entry(key, Entry::with_ttl(value, ttl.as_secs()))
            .await
    }

    async fn set_entry(&self, key: &str, entry: Entry) -> Result<()> {
        let key = ValidatedKey::new(key)?;
        let start = Instant::now();
        let size_bytes = serde_json::to_vec(&entry.value).map(|v| v.len()).unwrap_or(0);
        self.index_manager.update(key.as_str(), &entry.value);
        let mut guard = self.inner.write().await;
        guard.documents.insert(key.as_str().to_string(), entry);
        guard.dirty = true;
        drop(guard);
        self.stats.record_set(start.elapsed());
        log_operation(
            &Operation::Set {
                key: key.into_string(),
                size_bytes,
            },
            &Ok(()),
        );
        Ok(())
    }

    /// Remove `key` from the document map and every index. No-op if absent.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let key = ValidatedKey::new(key)?;
        let mut guard = self.inner.write().await;
        let existed = guard.documents.remove(key.as_str()).is_some();
        if existed {
            guard.dirty = true;
        }
        drop(guard);
        if existed {
            self.index_manager.remove(key.as_str());
        }
        self.stats.record_delete();
        log_operation(
            &Operation::Delete {
                key: key.into_string(),
                existed,
            },
            &Ok(()),
        );
        Ok(existed)
    }

    pub fn create_index(&self, field: &str, index_type: IndexType) {
        self.index_manager.add_index(
            field,
            index_type,
            crate::index_manager::DEFAULT_VECTOR_DIMENSION,
        );
        log_operation(
            &Operation::CreateIndex {
                field: field.to_string(),
                index_type: index_type.to_string(),
            },
            &Ok(()),
        );
    }

    pub fn remove_index(&self, field: &str, index_type: IndexType) -> Result<()> {
        let result = self.index_manager.remove_index(field, index_type);
        log_operation(
            &Operation::RemoveIndex {
                field: field.to_string(),
                index_type: index_type.to_string(),
            },
            &result.as_ref().map(|_| ()).map_err(|e| anyhow::anyhow!(e.to_string())),
        );
        result
    }

    /// Run a hybrid search against the current document map.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let guard = self.inner.read().await;
        let result = search::search(&self.index_manager, &guard.documents, query);
        drop(guard);
        self.stats.record_search(start.elapsed());
        log_operation(
            &Operation::Search {
                result_count: result.as_ref().map(|r| r.len()).unwrap_or(0),
            },
            &result.as_ref().map(|_| ()).map_err(|e| anyhow::anyhow!(e.to_string())),
        );
        result
    }

    /// Flush in-memory state to the mmap region if dirty. No-op otherwise.
    pub async fn sync(&self) -> Result<()> {
        let mut guard = self.inner.write().await;
        sync_locked(&mut guard, &self.stats)
    }

    pub fn get_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Signal the background task to stop, wait for it, perform a final
    /// sync, and flush the mmap region.
    pub async fn close(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.background.lock().unwrap().take() {
            let _ = handle.await;
        }
        let mut guard = self.inner.write().await;
        sync_locked(&mut guard, &self.stats)?;
        guard.region.flush()?;
        log_operation(&Operation::Shutdown, &Ok(()));
        Ok(())
    }
}

fn sync_locked(inner: &mut Inner, stats: &Stats) -> Result<()> {
    if !inner.dirty {
        return Ok(());
    }

    let now = now_secs();
    let clean: BTreeMap<String, Entry> = inner
        .documents
        .iter()
        .filter(|(_, entry)| !entry.is_expired_at(now))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let encoded = codec::encode(&clean)?;

    inner
        .region
        .ensure_capacity(encoded.len(), inner.opts.initial_size)?;
    inner.region.write_content(&encoded);
    inner.region.flush()?;

    inner.documents = clean;
    inner.dirty = false;
    stats.record_sync(
        inner.documents.len() as u64,
        inner.documents.len() as u64,
        inner.region.len() as u64,
    );
    log_operation(
        &Operation::Sync {
            entry_count: inner.documents.len(),
        },
        &Ok(()),
    );
    Ok(())
}

async fn run_background_task(
    inner: Arc<RwLock<Inner>>,
    index_manager: Arc<IndexManager>,
    stats: Arc<Stats>,
    mut expired_rx: mpsc::Receiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
    sync_interval: Duration,
) {
    let mut ticker = tokio::time::interval(sync_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut pending_expired: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                {
                    let mut guard = inner.write().await;
                    if let Err(e) = sync_locked(&mut guard, &stats) {
                        warn!(error = %e, "periodic sync failed");
                    }
                }
                run_gc(&inner, &index_manager, &stats).await;
                for key in pending_expired.drain(..) {
                    index_manager.remove(&key);
                }
            }
            Some(key) = expired_rx.recv() => {
                pending_expired.push(key);
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    debug!("background task shutting down");
                    break;
                }
            }
        }
    }
}

async fn run_gc(inner: &Arc<RwLock<Inner>>, index_manager: &IndexManager, stats: &Stats) {
    let now = now_secs();
    let mut guard = inner.write().await;
    let expired: Vec<String> = guard
        .documents
        .iter()
        .filter(|(_, entry)| entry.is_expired_at(now))
        .map(|(k, _)| k.clone())
        .collect();
    if expired.is_empty() {
        return;
    }
    for key in &expired {
        guard.documents.remove(key);
    }
    guard.dirty = true;
    drop(guard);

    for key in &expired {
        index_manager.remove(key);
    }
    stats.record_expired(expired.len() as u64);
    stats.record_gc();
    log_operation(
        &Operation::Gc {
            expired_count: expired.len(),
        },
        &Ok(()),
    );
}
