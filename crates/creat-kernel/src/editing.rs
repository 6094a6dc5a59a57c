//! Block editing engine.
//!
//! Structural edits on one document's block sequence. Every operation takes
//! the current blocks by reference and returns a fresh `Vec<Block>`; nothing
//! is mutated in place, so a caller holding the old sequence never observes
//! the edit.
//!
//! Lookups are a linear scan and only the first block with a matching id is
//! affected. An id that is not found (a stale reference from the view) makes
//! the operation return the sequence unchanged rather than an error.

use creat_types::{Block, BlockId, BlockMetadata, BlockType, UNTITLED};

fn position(blocks: &[Block], id: &BlockId) -> Option<usize> {
    blocks.iter().position(|b| &b.id == id)
}

/// Splice a fresh, empty block of `block_type` immediately after `after`.
///
/// Returns the new sequence and the new block's id, or the unchanged sequence
/// and `None` when `after` is not present.
pub fn insert_after(
    blocks: &[Block],
    after: &BlockId,
    block_type: BlockType,
) -> (Vec<Block>, Option<BlockId>) {
    let Some(idx) = position(blocks, after) else {
        tracing::debug!(block = %after, "insert_after: reference block not found");
        return (blocks.to_vec(), None);
    };
    let block = Block::new(block_type);
    let id = block.id;
    let mut next = Vec::with_capacity(blocks.len() + 1);
    next.extend_from_slice(&blocks[..=idx]);
    next.push(block);
    next.extend_from_slice(&blocks[idx + 1..]);
    (next, Some(id))
}

/// Add a fresh, empty block at the end of the sequence.
pub fn append(blocks: &[Block], block_type: BlockType) -> (Vec<Block>, BlockId) {
    let block = Block::new(block_type);
    let id = block.id;
    let mut next = blocks.to_vec();
    next.push(block);
    (next, id)
}

/// Remove a block. A single-block sequence is returned unchanged.
pub fn remove(blocks: &[Block], id: &BlockId) -> Vec<Block> {
    if blocks.len() <= 1 {
        return blocks.to_vec();
    }
    let Some(idx) = position(blocks, id) else {
        return blocks.to_vec();
    };
    let mut next = blocks.to_vec();
    next.remove(idx);
    next
}

/// Block that should receive focus after `id` is removed: the one right
/// before it, if any.
///
/// Computed against the sequence *before* removal. Returns `None` when the
/// block is first, missing, or the only block (removal would be a no-op).
pub fn focus_after_remove(blocks: &[Block], id: &BlockId) -> Option<BlockId> {
    if blocks.len() <= 1 {
        return None;
    }
    let idx = position(blocks, id)?;
    idx.checked_sub(1).map(|prev| blocks[prev].id)
}

/// Replace a block's type. Content, id, and metadata are kept verbatim.
pub fn change_type(blocks: &[Block], id: &BlockId, block_type: BlockType) -> Vec<Block> {
    let mut next = blocks.to_vec();
    if let Some(idx) = position(blocks, id) {
        next[idx].block_type = block_type;
    }
    next
}

/// Replace a block's content and shallow-merge `patch` into its metadata.
pub fn update_content(
    blocks: &[Block],
    id: &BlockId,
    content: impl Into<String>,
    patch: Option<&BlockMetadata>,
) -> Vec<Block> {
    let mut next = blocks.to_vec();
    if let Some(idx) = position(blocks, id) {
        let block = &mut next[idx];
        block.content = content.into();
        if let Some(patch) = patch {
            block.metadata.merge(patch);
        }
    }
    next
}

/// Derived document title: the trimmed content of the first Heading1, or
/// [`UNTITLED`] when there is none or it is blank.
pub fn recompute_title(blocks: &[Block]) -> String {
    blocks
        .iter()
        .find(|b| b.block_type == BlockType::Heading1)
        .map(|b| b.content.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string()
}
