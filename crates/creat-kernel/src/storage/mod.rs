//! Persistence backends for the document collection.
//!
//! The store never touches the filesystem directly. It holds a
//! `Box<dyn StorageBackend>` and hands it the whole serialized collection on
//! every mutation. A backend only has to get and put one opaque string under
//! the fixed namespace key [`STORAGE_KEY`].

pub mod local;
pub mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

use std::io;
use thiserror::Error;

/// Namespace key the collection blob lives under.
pub const STORAGE_KEY: &str = "creat_documents_v1";

/// Storage error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure.
    #[error("storage io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Backend refuses writes.
    #[error("storage is read-only")]
    ReadOnly,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Where the serialized collection lives.
///
/// `load` returns `Ok(None)` when nothing has ever been saved; that is the
/// signal to seed the welcome document. Implementations must be cheap to call
/// after every mutation.
pub trait StorageBackend: Send + Sync {
    /// Backend name for logging (e.g. "memory", "local").
    fn name(&self) -> &str;

    /// Read the persisted blob, if any.
    fn load(&self) -> StorageResult<Option<String>>;

    /// Replace the persisted blob.
    fn save(&self, blob: &str) -> StorageResult<()>;
}
