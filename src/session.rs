//! Session layer: an LRU cache of open workbooks in front of the snapshot
//! store, with a dirty flag so a batch persists once at its end instead of
//! per action.
//!
//! Each cached workbook sits behind its own mutex, which serializes
//! concurrent requests to the same identifier; requests to different
//! workbooks proceed independently.

use crate::actions;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::{
    Action, BatchResponse, CellWriteParams, CellWriteResponse, WindowParams, WindowResponse,
    WorkbookId, WorkbookMetadataResponse,
};
use crate::store::SnapshotStore;
use crate::window;
use crate::workbook::Workbook;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task;
use tracing::{debug, info};

struct WorkbookSession {
    workbook: Workbook,
    dirty: bool,
}

/// Shared engine state: config, snapshot store, and the session cache.
pub struct EngineState {
    config: Arc<EngineConfig>,
    store: Arc<dyn SnapshotStore>,
    cache: RwLock<LruCache<WorkbookId, Arc<Mutex<WorkbookSession>>>>,
    cache_ops: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub operations: u64,
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.hits as f64 / self.operations as f64
        }
    }
}

fn join_error(err: task::JoinError) -> EngineError {
    EngineError::Storage(std::io::Error::other(err.to_string()))
}

impl EngineState {
    pub fn new(config: Arc<EngineConfig>, store: Arc<dyn SnapshotStore>) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity.max(1))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            store,
            cache: RwLock::new(LruCache::new(capacity)),
            cache_ops: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> Arc<EngineConfig> {
        self.config.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.read();
        CacheStats {
            operations: self.cache_ops.load(Ordering::Relaxed),
            hits: self.cache_hits.load(Ordering::Relaxed),
            misses: self.cache_misses.load(Ordering::Relaxed),
            size: cache.len(),
            capacity: cache.cap().get(),
        }
    }

    async fn open(&self, id: &WorkbookId) -> Result<Arc<Mutex<WorkbookSession>>> {
        self.cache_ops.fetch_add(1, Ordering::Relaxed);
        {
            let mut cache = self.cache.write();
            if let Some(session) = cache.get(id) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(workbook = %id, "session cache hit");
                return Ok(session.clone());
            }
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        debug!(workbook = %id, "session cache miss");

        // Load off the async runtime; snapshot decode is blocking work.
        let store = self.store.clone();
        let load_id = id.clone();
        let workbook = task::spawn_blocking(move || store.load(&load_id))
            .await
            .map_err(join_error)??;
        let session = Arc::new(Mutex::new(WorkbookSession {
            workbook,
            dirty: false,
        }));
        let mut cache = self.cache.write();
        // A racing open may have inserted first; keep whichever is cached.
        if let Some(existing) = cache.get(id) {
            return Ok(existing.clone());
        }
        cache.put(id.clone(), session.clone());
        Ok(session)
    }

    async fn persist(&self, id: &WorkbookId, workbook: Workbook) -> Result<()> {
        let store = self.store.clone();
        let save_id = id.clone();
        task::spawn_blocking(move || store.save(&save_id, &workbook))
            .await
            .map_err(join_error)?
    }

    /// Create (or overwrite) a workbook snapshot and drop any stale cached
    /// session for it.
    pub async fn create_workbook(&self, id: &WorkbookId, workbook: Workbook) -> Result<()> {
        self.persist(id, workbook).await?;
        self.cache.write().pop(id);
        info!(workbook = %id, "workbook snapshot created");
        Ok(())
    }

    /// Run an ordered action batch against one workbook. Committed steps are
    /// persisted in a single save at the end of the batch, even when a later
    /// step failed.
    pub async fn apply_actions(
        &self,
        id: &WorkbookId,
        batch: &[Action],
    ) -> Result<BatchResponse> {
        let session = self.open(id).await?;
        let (response, snapshot) = {
            let mut guard = session.lock();
            let response =
                actions::apply_batch(&mut guard.workbook, batch, self.config.scan_depth);
            let committed = response.results.iter().any(|step| step.success);
            if committed {
                guard.dirty = true;
            }
            let snapshot = guard.dirty.then(|| guard.workbook.clone());
            (response, snapshot)
        };
        if let Some(workbook) = snapshot {
            self.persist(id, workbook).await?;
            session.lock().dirty = false;
        }
        info!(
            workbook = %id,
            steps = response.results.len(),
            success = response.success,
            "action batch finished"
        );
        Ok(response)
    }

    pub async fn read_window(
        &self,
        id: &WorkbookId,
        params: &WindowParams,
    ) -> Result<WindowResponse> {
        let session = self.open(id).await?;
        let guard = session.lock();
        window::read_window(&guard.workbook, params, self.config.virtual_bounds)
    }

    /// Raw single-cell write. Persists by re-serializing the whole workbook,
    /// so every edit costs a full save.
    pub async fn write_cell(
        &self,
        id: &WorkbookId,
        params: &CellWriteParams,
    ) -> Result<CellWriteResponse> {
        let session = self.open(id).await?;
        let (response, snapshot) = {
            let mut guard = session.lock();
            let response = window::write_cell(&mut guard.workbook, params)?;
            (response, guard.workbook.clone())
        };
        self.persist(id, snapshot).await?;
        session.lock().dirty = false;
        Ok(response)
    }

    pub async fn workbook_metadata(&self, id: &WorkbookId) -> Result<WorkbookMetadataResponse> {
        let session = self.open(id).await?;
        let guard = session.lock();
        Ok(guard.workbook.metadata())
    }

    pub async fn list_workbooks(&self) -> Result<Vec<WorkbookId>> {
        let store = self.store.clone();
        task::spawn_blocking(move || store.list())
            .await
            .map_err(join_error)?
    }

    /// Persist a cached session's unsaved changes, if any.
    pub async fn flush(&self, id: &WorkbookId) -> Result<()> {
        let session = {
            let mut cache = self.cache.write();
            cache.get(id).cloned()
        };
        let Some(session) = session else {
            return Ok(());
        };
        let snapshot = {
            let guard = session.lock();
            guard.dirty.then(|| guard.workbook.clone())
        };
        if let Some(workbook) = snapshot {
            self.persist(id, workbook).await?;
            session.lock().dirty = false;
            debug!(workbook = %id, "session flushed");
        }
        Ok(())
    }

    /// Flush and evict one session.
    pub async fn close_workbook(&self, id: &WorkbookId) -> Result<()> {
        self.flush(id).await?;
        self.cache.write().pop(id);
        debug!(workbook = %id, "session closed");
        Ok(())
    }
}
