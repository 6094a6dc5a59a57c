//! # creat-kernel
//!
//! Core of the CREAT block editor.
//!
//! A document is an ordered list of typed blocks (headings, paragraphs,
//! images, runnable code). The kernel:
//! - Owns the document collection and persists it after every change
//! - Applies structural edits (insert, split, remove, retype) as pure
//!   functions over the block sequence
//! - Tracks one open document per [`EditSession`], gating async results
//!   through a [`RequestLedger`]
//! - Renders code blocks into sandboxed previews and documents into posts
//! - Generates block content through a pluggable backend

pub mod config;
pub mod editing;
mod html;
pub mod image;
pub mod llm;
pub mod preview;
pub mod publish;
pub mod requests;
pub mod seed;
pub mod session;
pub mod storage;
pub mod store;

pub use config::{ConfigError, CreatConfig};
pub use image::ImageError;
pub use llm::{
    BackendError, BackendResult, CommandBackend, ContentGenerator, GenerationBackend,
    GenerationError, GenerationRequest,
};
pub use preview::{PreviewCache, PreviewFrame, PreviewRenderer, PreviewSurface};
pub use publish::{PostRenderer, render_post};
pub use requests::{RequestKind, RequestLedger, RequestToken};
pub use session::{EditSession, GenerationTicket, Key, KeyOutcome};
pub use storage::{LocalStorage, MemoryStorage, StorageBackend, StorageError, StorageResult};
pub use store::{
    DocumentEvent, DocumentPatch, DocumentStore, DocumentSummary, SharedDocumentStore,
    shared_document_store,
};
