//! Catalog store backends.
//!
//! - [`MemoryCatalogStore`]: process-local, for tests and embedding.
//! - [`FileCatalogStore`]: a JSON file holding a sorted array of capability
//!   strings. Each batch rewrites the file through a temporary sibling and a
//!   rename, so a failed batch leaves the previous contents intact.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use capgate_engine::{CapabilitySet, CatalogStore, StoreError};

/// In-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    entries: RwLock<CapabilitySet>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog that already holds `entries`.
    pub fn with_entries(entries: CapabilitySet) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

fn lock_error(e: impl std::fmt::Display) -> StoreError {
    tracing::error!("catalog_store: lock poisoned: {e}");
    StoreError::new("memory", "catalog lock poisoned")
}

impl CatalogStore for MemoryCatalogStore {
    fn load(&self) -> Result<CapabilitySet, StoreError> {
        Ok(self.entries.read().map_err(lock_error)?.clone())
    }

    fn add_all(&self, capabilities: &CapabilitySet) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(lock_error)?
            .extend(capabilities.iter().cloned());
        Ok(())
    }

    fn remove_all(&self, capabilities: &CapabilitySet) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(lock_error)?
            .retain(|cap| !capabilities.contains(cap));
        Ok(())
    }

    fn contains(&self, capability: &str) -> Result<bool, StoreError> {
        Ok(self.entries.read().map_err(lock_error)?.contains(capability))
    }
}

const FILE_BACKEND: &str = "file";

/// Catalog persisted as a JSON array in a file.
///
/// A missing file reads as an empty catalog.
#[derive(Debug, Clone)]
pub struct FileCatalogStore {
    path: PathBuf,
}

impl FileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, e: impl std::fmt::Display) -> StoreError {
        StoreError::new(
            FILE_BACKEND,
            format!("failed to {action} {}: {e}", self.path.display()),
        )
    }

    fn write(&self, entries: &CapabilitySet) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| self.io_error("serialize catalog for", e))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file =
            std::fs::File::create(&tmp).map_err(|e| self.io_error("create temp for", e))?;
        let written = file
            .write_all(&json)
            .and_then(|()| file.sync_all())
            .map_err(|e| self.io_error("write temp for", e));
        drop(file);
        let replaced = written.and_then(|()| {
            std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error("replace", e))
        });
        if let Err(e) = replaced {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                tracing::warn!(
                    path = %tmp.display(),
                    error = %cleanup,
                    "catalog_store: failed to remove temp file"
                );
            }
            return Err(e);
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "catalog_store: written"
        );
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut CapabilitySet)) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        apply(&mut entries);
        self.write(&entries)
    }
}

impl CatalogStore for FileCatalogStore {
    fn load(&self) -> Result<CapabilitySet, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CapabilitySet::new()),
            Err(e) => return Err(self.io_error("read", e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| self.io_error("parse", e))
    }

    fn add_all(&self, capabilities: &CapabilitySet) -> Result<(), StoreError> {
        self.update(|entries| entries.extend(capabilities.iter().cloned()))
    }

    fn remove_all(&self, capabilities: &CapabilitySet) -> Result<(), StoreError> {
        self.update(|entries| entries.retain(|cap| !capabilities.contains(cap)))
    }
}
