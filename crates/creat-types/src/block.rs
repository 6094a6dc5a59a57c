//! Block types: the smallest addressable unit of a document.
//!
//! ## Design: one content string for every type
//!
//! `BlockType` decides how `content` is interpreted (plain text, an image data
//! URI, or source markup) but never how it is stored. Converting a block's
//! type therefore never touches its content, and a code block turned into a
//! paragraph keeps its raw source as plain text.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::BlockId;

/// What a block *is* (content type).
///
/// Serialized as the short lowercase tags used by the persisted collection:
/// `h1`, `h2`, `h3`, `paragraph`, `image`, `code`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BlockType {
    #[serde(rename = "h1")]
    #[strum(serialize = "h1", serialize = "heading1")]
    Heading1,
    #[serde(rename = "h2")]
    #[strum(serialize = "h2", serialize = "heading2")]
    Heading2,
    #[serde(rename = "h3")]
    #[strum(serialize = "h3", serialize = "heading3")]
    Heading3,
    /// Plain prose. The type of every freshly inserted block.
    #[default]
    #[strum(serialize = "paragraph", serialize = "p", serialize = "text")]
    Paragraph,
    /// Content is a data URI (or any image reference).
    Image,
    /// Content is HTML/CSS/JS source, run in the sandboxed preview.
    Code,
}

impl BlockType {
    /// Every block type, in menu order.
    pub const ALL: [BlockType; 6] = [
        BlockType::Heading1,
        BlockType::Heading2,
        BlockType::Heading3,
        BlockType::Paragraph,
        BlockType::Image,
        BlockType::Code,
    ];

    /// Parse from string (case-insensitive).
    ///
    /// Supports aliases: "heading1" -> Heading1, "text"/"p" -> Paragraph.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation (the serialized tag).
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Heading1 => "h1",
            BlockType::Heading2 => "h2",
            BlockType::Heading3 => "h3",
            BlockType::Paragraph => "paragraph",
            BlockType::Image => "image",
            BlockType::Code => "code",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional presentation hints attached to a block.
///
/// None of these are required for correctness. Keys are camelCase on the wire
/// (`isRunning`), unknown keys are ignored on load, and an all-empty bag is
/// omitted from the serialized block entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    /// Language hint for code blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Caption for image blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Transient "preview running" flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
    /// Preferred preview height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl BlockMetadata {
    /// Check if no key is set.
    pub fn is_empty(&self) -> bool {
        self.language.is_none()
            && self.caption.is_none()
            && self.is_running.is_none()
            && self.height.is_none()
    }

    /// Shallow merge: keys set in `patch` overwrite, unset keys are kept.
    pub fn merge(&mut self, patch: &BlockMetadata) {
        if patch.language.is_some() {
            self.language = patch.language.clone();
        }
        if patch.caption.is_some() {
            self.caption = patch.caption.clone();
        }
        if patch.is_running.is_some() {
            self.is_running = patch.is_running;
        }
        if patch.height.is_some() {
            self.height = patch.height;
        }
    }

    /// Set the preferred preview height.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Set the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the language hint.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// A unit of content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Assigned at creation, never changes.
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: String,
    #[serde(default, skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
}

impl Block {
    /// Create an empty block of the given type with a fresh id.
    pub fn new(block_type: BlockType) -> Self {
        Self {
            id: BlockId::new(),
            block_type,
            content: String::new(),
            metadata: BlockMetadata::default(),
        }
    }

    /// Create a block with content and a fresh id.
    pub fn with_content(block_type: BlockType, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::new(block_type)
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: BlockMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Check if the content is the empty string.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
