//! Documents: an ordered sequence of blocks plus a derived title.

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockType};
use crate::ids::{BlockId, DocumentId};

/// Title used when a document has no non-blank Heading1 block.
pub const UNTITLED: &str = "Untitled";

/// An ordered sequence of blocks plus metadata; the unit of storage and
/// publication.
///
/// `blocks` is never empty for documents created through this crate. Field
/// names are camelCase on the wire (`createdAt`, `updatedAt`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    /// Mirrors the first Heading1 block; see `creat_kernel::editing::recompute_title`.
    pub title: String,
    pub blocks: Vec<Block>,
    /// Unix millis; never changes after creation.
    pub created_at: u64,
    /// Unix millis; bumped on every mutation.
    pub updated_at: u64,
}

impl Document {
    /// A fresh "Untitled" document holding a single empty paragraph.
    pub fn new() -> Self {
        let now = crate::now_millis();
        Self {
            id: DocumentId::new(),
            title: UNTITLED.to_string(),
            blocks: vec![Block::new(BlockType::Paragraph)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up a block by id (first match).
    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    /// Index of a block by id (first match).
    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    /// Check if any block is a code block.
    pub fn has_code(&self) -> bool {
        self.blocks.iter().any(|b| b.block_type == BlockType::Code)
    }

    /// Content of the first paragraph, used as the list-view teaser.
    pub fn first_paragraph(&self) -> Option<&str> {
        self.blocks
            .iter()
            .find(|b| b.block_type == BlockType::Paragraph)
            .map(|b| b.content.as_str())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
