//! Request tokens for asynchronous block updates.
//!
//! Image reads and content generation settle some time after they were
//! triggered. Each trigger takes a [`RequestToken`] scoped to the target
//! block; issuing a newer token for the same block, or editing the block by
//! hand, supersedes it. A settled result is applied only if its token is
//! still current, so a slow response can never overwrite newer content.

use std::collections::HashMap;

use creat_types::BlockId;

/// Why an async result was issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// Reading an image file into a data URI.
    Image,
    /// Generating block content from a prompt.
    Generation,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Image => write!(f, "image"),
            RequestKind::Generation => write!(f, "generation"),
        }
    }
}

/// Ticket for one in-flight request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestToken {
    pub block_id: BlockId,
    pub kind: RequestKind,
    seq: u64,
}

impl RequestToken {
    /// Monotonic sequence number (unique per ledger).
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Tracks the current request per block.
///
/// Sequence numbers come from a single monotonic counter, so a token can be
/// compared against the block's latest without any wall-clock involvement.
#[derive(Debug, Default)]
pub struct RequestLedger {
    next_seq: u64,
    current: HashMap<BlockId, u64>,
}

impl RequestLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Issue a token for `block_id`, superseding any outstanding one.
    pub fn issue(&mut self, block_id: BlockId, kind: RequestKind) -> RequestToken {
        let seq = self.tick();
        self.current.insert(block_id, seq);
        RequestToken {
            block_id,
            kind,
            seq,
        }
    }

    /// Supersede any outstanding request for `block_id` (e.g. after a manual edit).
    ///
    /// Returns `true` if a request was outstanding.
    pub fn invalidate(&mut self, block_id: &BlockId) -> bool {
        self.current.remove(block_id).is_some()
    }

    /// Check whether `token` is still the latest for its block.
    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.current.get(&token.block_id) == Some(&token.seq)
    }

    /// Retire `token`. Returns `true` if it was current, meaning its result
    /// may be applied.
    pub fn settle(&mut self, token: &RequestToken) -> bool {
        if self.is_current(token) {
            self.current.remove(&token.block_id);
            true
        } else {
            false
        }
    }

    /// Check whether any request is outstanding for `block_id`.
    pub fn is_pending(&self, block_id: &BlockId) -> bool {
        self.current.contains_key(block_id)
    }

    /// Number of outstanding requests.
    pub fn pending(&self) -> usize {
        self.current.len()
    }
}
