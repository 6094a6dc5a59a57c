//! Local filesystem storage backend.
//!
//! Keeps the collection in `<dir>/creat_documents_v1.json`. Writes go to a
//! sibling temp file first and are renamed into place, so a crash mid-write
//! leaves the previous blob intact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{STORAGE_KEY, StorageBackend, StorageError, StorageResult};

/// Local filesystem backend rooted at a data directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Store the collection under `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    /// Full path of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl StorageBackend for LocalStorage {
    fn name(&self) -> &str {
        "local"
    }

    fn load(&self) -> StorageResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, blob: &str) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, blob).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}
