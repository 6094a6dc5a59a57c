//! Shared identity, block, and document types for CREAT.
//!
//! This crate is the data model: typed IDs, blocks, and documents. It has
//! **no internal creat dependencies**: a pure leaf crate that the kernel and
//! the CLI build on.
//!
//! ```text
//! Document (DocumentId)
//!     └── title (derived from the first Heading1)
//!     └── blocks: ordered Vec<Block>, never empty
//!             └── Block (BlockId) ── type + content string + metadata
//! ```
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`Document`]      | Ordered blocks + title + timestamps          |
//! | [`Block`]         | One unit of content                          |
//! | [`BlockType`]     | Heading1..3, Paragraph, Image, Code          |
//! | [`BlockMetadata`] | Optional presentation hints                  |
//! | [`DocumentId`]    | Which document                               |
//! | [`BlockId`]       | Which block within a document                |
//! |-------------------|----------------------------------------------|

pub mod block;
pub mod document;
pub mod ids;

pub use block::{Block, BlockMetadata, BlockType};
pub use document::{Document, UNTITLED};
pub use ids::{BlockId, DocumentId, PrefixError, resolve_document_prefix};

/// Current time as Unix milliseconds. Used by constructors throughout the crate.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
