//! Document store: the session's collection of documents.
//!
//! Owns every document, persists the whole collection through an injected
//! [`StorageBackend`] after each mutation, and broadcasts a
//! [`DocumentEvent`] to subscribers whenever a document changes.
//!
//! # Concurrency Model
//!
//! - One `parking_lot::RwLock` around the collection
//! - A mutation holds the write lock through serialization and `save`, so
//!   flushes land in mutation order
//! - Event broadcasting for views that need to re-render

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use creat_types::{
    Block, Document, DocumentId, PrefixError, now_millis, resolve_document_prefix,
};

use crate::seed::welcome_document;
use crate::storage::StorageBackend;

/// Teaser shown for documents without any paragraph text.
pub const NO_PREVIEW: &str = "No preview text available.";

/// Events broadcast when documents change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A new document was created.
    Created { id: DocumentId },
    /// A document's title or blocks were replaced.
    Updated { id: DocumentId },
    /// A document was deleted.
    Removed { id: DocumentId },
}

/// Fields to merge into a document. `None` leaves the field as is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub blocks: Option<Vec<Block>>,
}

impl DocumentPatch {
    /// Patch that replaces the block sequence.
    pub fn blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Some(blocks),
            ..Default::default()
        }
    }

    /// Also replace the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// What the document list shows for each document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    /// First paragraph's content, or [`NO_PREVIEW`].
    pub preview: String,
    pub has_code: bool,
    pub block_count: usize,
    pub updated_at: u64,
}

impl DocumentSummary {
    fn from_document(doc: &Document) -> Self {
        let preview = doc
            .first_paragraph()
            .filter(|p| !p.is_empty())
            .unwrap_or(NO_PREVIEW)
            .to_string();
        Self {
            id: doc.id,
            title: doc.title.clone(),
            preview,
            has_code: doc.has_code(),
            block_count: doc.blocks.len(),
            updated_at: doc.updated_at,
        }
    }
}

/// The session's documents, most recent first.
pub struct DocumentStore {
    /// Ordered collection (front = most recently created).
    documents: RwLock<Vec<Document>>,
    /// Where the serialized collection is flushed.
    storage: Box<dyn StorageBackend>,
    /// Event broadcaster.
    event_tx: broadcast::Sender<DocumentEvent>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("storage", &self.storage.name())
            .field("documents", &self.documents.read().len())
            .finish()
    }
}

impl DocumentStore {
    /// Restore the collection from `storage`.
    ///
    /// - nothing persisted: seeds the welcome document and flushes it
    /// - malformed blob: logs and starts empty, leaving the blob untouched
    ///   until the first mutation overwrites it
    /// - read failure: logs and starts empty
    pub fn load(storage: impl StorageBackend + 'static) -> Self {
        Self::load_boxed(Box::new(storage))
    }

    /// [`DocumentStore::load`] for an already boxed backend.
    pub fn load_boxed(storage: Box<dyn StorageBackend>) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        let (documents, seeded) = match storage.load() {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<Document>>(&blob) {
                Ok(documents) => {
                    tracing::debug!(
                        backend = storage.name(),
                        count = documents.len(),
                        "loaded documents"
                    );
                    (documents, false)
                }
                Err(e) => {
                    tracing::error!(
                        backend = storage.name(),
                        "failed to parse documents, starting empty: {e}"
                    );
                    (Vec::new(), false)
                }
            },
            Ok(None) => {
                tracing::info!(backend = storage.name(), "no saved documents, seeding welcome document");
                (vec![welcome_document()], true)
            }
            Err(e) => {
                tracing::error!(backend = storage.name(), "failed to read documents, starting empty: {e}");
                (Vec::new(), false)
            }
        };

        let store = Self {
            documents: RwLock::new(documents),
            storage,
            event_tx,
        };
        if seeded {
            let docs = store.documents.write();
            store.flush(&docs);
        }
        store
    }

    /// Get the event receiver for subscribing to changes.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.event_tx.subscribe()
    }

    /// Serialize the whole collection and hand it to the backend.
    ///
    /// Fire-and-forget: a failed save is logged and the in-memory state stays
    /// authoritative.
    fn flush(&self, documents: &[Document]) {
        let blob = match serde_json::to_string(documents) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!("failed to serialize documents: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.save(&blob) {
            tracing::warn!(backend = self.storage.name(), "failed to save documents: {e}");
        }
    }

    fn emit(&self, event: DocumentEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Create an "Untitled" document with one empty paragraph at the front of
    /// the collection.
    pub fn create(&self) -> DocumentId {
        let doc = Document::new();
        let id = doc.id;
        {
            let mut docs = self.documents.write();
            docs.insert(0, doc);
            self.flush(&docs);
        }
        tracing::info!(document = %id, "created document");
        self.emit(DocumentEvent::Created { id });
        id
    }

    /// Merge `patch` into the document and bump `updated_at`.
    ///
    /// Returns `false` when the id is unknown; neither memory nor storage
    /// is touched then.
    pub fn update(&self, id: &DocumentId, patch: DocumentPatch) -> bool {
        let found = {
            let mut docs = self.documents.write();
            match docs.iter_mut().find(|d| &d.id == id) {
                Some(doc) => {
                    if let Some(title) = patch.title {
                        doc.title = title;
                    }
                    if let Some(blocks) = patch.blocks {
                        doc.blocks = blocks;
                    }
                    doc.updated_at = now_millis();
                    self.flush(&docs);
                    true
                }
                None => false,
            }
        };
        if found {
            tracing::debug!(document = %id, "updated document");
            self.emit(DocumentEvent::Updated { id: *id });
        } else {
            tracing::debug!(document = %id, "update: document not found");
        }
        found
    }

    /// Delete a document. Returns `false` when the id is unknown, without
    /// writing to storage.
    pub fn remove(&self, id: &DocumentId) -> bool {
        let found = {
            let mut docs = self.documents.write();
            match docs.iter().position(|d| &d.id == id) {
                Some(idx) => {
                    docs.remove(idx);
                    self.flush(&docs);
                    true
                }
                None => false,
            }
        };
        if found {
            tracing::info!(document = %id, "removed document");
            self.emit(DocumentEvent::Removed { id: *id });
        }
        found
    }

    /// Get a document by id.
    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        self.documents.read().iter().find(|d| &d.id == id).cloned()
    }

    /// All documents, most recent first.
    pub fn list(&self) -> Vec<Document> {
        self.documents.read().clone()
    }

    /// List-view data for every document.
    pub fn summaries(&self) -> Vec<DocumentSummary> {
        self.documents
            .read()
            .iter()
            .map(DocumentSummary::from_document)
            .collect()
    }

    /// Get the number of documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Resolve a full id, exact title, or unique id prefix to a document.
    pub fn resolve(&self, query: &str) -> Result<DocumentId, PrefixError> {
        let docs = self.documents.read();
        resolve_document_prefix(docs.iter().map(|d| (d.id, d.title.as_str())), query)
    }
}

/// Thread-safe handle to a DocumentStore.
pub type SharedDocumentStore = Arc<DocumentStore>;

/// Load a shared store from `storage`.
pub fn shared_document_store(storage: impl StorageBackend + 'static) -> SharedDocumentStore {
    Arc::new(DocumentStore::load(storage))
}
