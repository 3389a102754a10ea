//! Snapshot persistence. The engine treats a workbook identifier as opaque;
//! the store decides where bytes live. Saves replace the whole snapshot,
//! there is no incremental persistence.

use crate::error::{EngineError, Result};
use crate::model::WorkbookId;
use crate::workbook::Workbook;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const SNAPSHOT_EXTENSION: &str = "json";

/// Load/save boundary for workbook snapshots.
pub trait SnapshotStore: Send + Sync {
    fn load(&self, id: &WorkbookId) -> Result<Workbook>;
    fn save(&self, id: &WorkbookId, workbook: &Workbook) -> Result<()>;
    fn list(&self) -> Result<Vec<WorkbookId>>;
    fn exists(&self, id: &WorkbookId) -> bool;
}

/// Filesystem store keeping one JSON file per workbook under a root
/// directory. Saves are atomic: written to a temp file in the same
/// directory, then renamed over the target.
pub struct JsonSnapshotStore {
    root: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_path(&self, id: &WorkbookId) -> Result<PathBuf> {
        let name = id.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(EngineError::InvalidOperation(format!(
                "workbook id {name:?} is not a plain name"
            )));
        }
        Ok(self.root.join(format!("{name}.{SNAPSHOT_EXTENSION}")))
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self, id: &WorkbookId) -> Result<Workbook> {
        let path = self.snapshot_path(id)?;
        if !path.is_file() {
            return Err(EngineError::WorkbookNotFound(id.clone()));
        }
        let contents = std::fs::read_to_string(&path)?;
        let workbook = serde_json::from_str(&contents)?;
        debug!(workbook = %id, path = %path.display(), "snapshot loaded");
        Ok(workbook)
    }

    fn save(&self, id: &WorkbookId, workbook: &Workbook) -> Result<()> {
        let path = self.snapshot_path(id)?;
        let encoded = serde_json::to_vec_pretty(workbook)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&encoded)?;
        tmp.persist(&path).map_err(|err| err.error)?;
        debug!(workbook = %id, bytes = encoded.len(), "snapshot saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<WorkbookId>> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| {
                EngineError::Storage(err.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("unreadable directory entry")
                }))
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let is_snapshot = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(SNAPSHOT_EXTENSION));
            if !is_snapshot {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(WorkbookId(stem.to_string()));
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    fn exists(&self, id: &WorkbookId) -> bool {
        self.snapshot_path(id)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }
}
