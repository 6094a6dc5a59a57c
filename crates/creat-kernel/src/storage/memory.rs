//! In-memory storage backend.
//!
//! Used for tests and `--ephemeral` runs. All data is lost when dropped.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{StorageBackend, StorageError, StorageResult};

/// In-memory storage backend.
///
/// Clones share the same slot, so a test can keep a handle and inspect what
/// the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blob: Arc<RwLock<Option<String>>>,
    read_only: bool,
    saves: Arc<RwLock<usize>>,
}

impl MemoryStorage {
    /// Create an empty backend (nothing persisted yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that already holds a blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        let storage = Self::new();
        *storage.blob.write() = Some(blob.into());
        storage
    }

    /// A backend whose `save` always fails.
    pub fn read_only(blob: Option<String>) -> Self {
        Self {
            blob: Arc::new(RwLock::new(blob)),
            read_only: true,
            saves: Arc::default(),
        }
    }

    /// Current blob contents.
    pub fn blob(&self) -> Option<String> {
        self.blob.read().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *self.saves.read()
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> StorageResult<Option<String>> {
        Ok(self.blob.read().clone())
    }

    fn save(&self, blob: &str) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        *self.blob.write() = Some(blob.to_string());
        *self.saves.write() += 1;
        Ok(())
    }
}
