//! Edit session: one open document, the focused block, and in-flight requests.
//!
//! Every edit runs the editing engine over the document's current blocks and
//! writes the result back through [`DocumentStore::update`] together with the
//! recomputed title, so the store (and its subscribers) always see a
//! consistent document.
//!
//! Asynchronous results (generated text, image data) go through the
//! session's [`RequestLedger`]: they land only if no newer request or manual
//! edit touched the block in the meantime.

use std::path::Path;

use creat_types::{Block, BlockId, BlockMetadata, BlockType, Document, DocumentId};

use crate::editing;
use crate::image::{self, ImageError};
use crate::llm::{ContentGenerator, GenerationError};
use crate::requests::{RequestKind, RequestLedger, RequestToken};
use crate::store::{DocumentPatch, SharedDocumentStore};

/// Keys with structural meaning in the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
}

/// What a key press did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A new paragraph was inserted after the block and focused.
    Inserted(BlockId),
    /// The block was removed; focus moved to the given block.
    Removed { focus: Option<BlockId> },
    /// No structural edit; the key is ordinary text input.
    Unhandled,
}

/// Everything a generation call needs, captured when it was started.
#[derive(Clone, Debug)]
pub struct GenerationTicket {
    pub token: RequestToken,
    pub target: BlockType,
    /// The block's content at the time of the request.
    pub context: String,
}

/// Editing state for one document.
pub struct EditSession {
    store: SharedDocumentStore,
    document_id: DocumentId,
    focused: Option<BlockId>,
    ledger: RequestLedger,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("document_id", &self.document_id)
            .field("focused", &self.focused)
            .field("pending", &self.ledger.pending())
            .finish()
    }
}

impl EditSession {
    /// Open a session on an existing document. Focus starts on its first block.
    pub fn open(store: SharedDocumentStore, document_id: DocumentId) -> Option<Self> {
        let doc = store.get(&document_id)?;
        Some(Self {
            focused: doc.blocks.first().map(|b| b.id),
            store,
            document_id,
            ledger: RequestLedger::new(),
        })
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    /// Current snapshot of the document, `None` if it was deleted meanwhile.
    pub fn document(&self) -> Option<Document> {
        self.store.get(&self.document_id)
    }

    pub fn focused(&self) -> Option<BlockId> {
        self.focused
    }

    pub fn focus(&mut self, block_id: BlockId) {
        self.focused = Some(block_id);
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    fn blocks(&self) -> Option<Vec<Block>> {
        self.document().map(|d| d.blocks)
    }

    /// Write `blocks` back with the recomputed title.
    fn commit(&self, blocks: Vec<Block>) -> bool {
        let title = editing::recompute_title(&blocks);
        self.store
            .update(&self.document_id, DocumentPatch::blocks(blocks).with_title(title))
    }

    /// Insert an empty block after `after` and focus it.
    pub fn insert_after(&mut self, after: &BlockId, block_type: BlockType) -> Option<BlockId> {
        let blocks = self.blocks()?;
        let (next, id) = editing::insert_after(&blocks, after, block_type);
        let id = id?;
        self.commit(next);
        self.focused = Some(id);
        Some(id)
    }

    /// Add an empty block at the end and focus it.
    pub fn append_block(&mut self, block_type: BlockType) -> Option<BlockId> {
        let blocks = self.blocks()?;
        let (next, id) = editing::append(&blocks, block_type);
        self.commit(next);
        self.focused = Some(id);
        Some(id)
    }

    /// Remove a block. Focus moves to the block before it, if there is one.
    ///
    /// Removing the first block leaves focus alone unless it pointed at the
    /// removed block, in which case nothing is focused. Returns `false` if
    /// nothing was removed (unknown id, or the last remaining block).
    pub fn remove_block(&mut self, block_id: &BlockId) -> bool {
        let Some(blocks) = self.blocks() else {
            return false;
        };
        let next = editing::remove(&blocks, block_id);
        if next.len() == blocks.len() {
            return false;
        }
        let focus = editing::focus_after_remove(&blocks, block_id);
        self.commit(next);
        self.ledger.invalidate(block_id);
        if focus.is_some() || self.focused.as_ref() == Some(block_id) {
            self.focused = focus;
        }
        true
    }

    /// Change a block's type, keeping its content.
    ///
    /// A real type change supersedes any outstanding request for the block,
    /// since its result was shaped for the old type.
    pub fn change_type(&mut self, block_id: &BlockId, block_type: BlockType) -> bool {
        let Some(blocks) = self.blocks() else {
            return false;
        };
        let Some(current) = blocks.iter().find(|b| &b.id == block_id) else {
            return false;
        };
        if current.block_type != block_type && self.ledger.invalidate(block_id) {
            tracing::debug!(block = %block_id, "type change superseded pending request");
        }
        self.commit(editing::change_type(&blocks, block_id, block_type))
    }

    /// Manual content edit. Supersedes any outstanding request for the block.
    pub fn update_content(
        &mut self,
        block_id: &BlockId,
        content: impl Into<String>,
        metadata: Option<&BlockMetadata>,
    ) -> bool {
        if self.ledger.invalidate(block_id) {
            tracing::debug!(block = %block_id, "manual edit superseded pending request");
        }
        self.write_content(block_id, content.into(), metadata)
    }

    fn write_content(
        &self,
        block_id: &BlockId,
        content: String,
        metadata: Option<&BlockMetadata>,
    ) -> bool {
        let Some(blocks) = self.blocks() else {
            return false;
        };
        if !blocks.iter().any(|b| &b.id == block_id) {
            return false;
        }
        self.commit(editing::update_content(&blocks, block_id, content, metadata))
    }

    /// Retype and fill a block in a single commit.
    fn write_typed(&self, block_id: &BlockId, block_type: BlockType, content: String) -> bool {
        let Some(blocks) = self.blocks() else {
            return false;
        };
        if !blocks.iter().any(|b| &b.id == block_id) {
            return false;
        }
        let retyped = editing::change_type(&blocks, block_id, block_type);
        self.commit(editing::update_content(&retyped, block_id, content, None))
    }

    /// Apply editor key semantics to `block_id`.
    ///
    /// Enter without Shift splits (inserts a paragraph after the block),
    /// except in code blocks where it is a newline. Backspace on an empty
    /// block removes it.
    pub fn handle_key(&mut self, block_id: &BlockId, key: Key, shift: bool) -> KeyOutcome {
        let Some(block) = self.document().and_then(|d| d.block(block_id).cloned()) else {
            return KeyOutcome::Unhandled;
        };
        match key {
            Key::Enter if !shift && block.block_type != BlockType::Code => self
                .insert_after(block_id, BlockType::Paragraph)
                .map_or(KeyOutcome::Unhandled, KeyOutcome::Inserted),
            Key::Backspace if block.content.is_empty() => {
                if self.remove_block(block_id) {
                    KeyOutcome::Removed {
                        focus: self.focused,
                    }
                } else {
                    KeyOutcome::Unhandled
                }
            }
            _ => KeyOutcome::Unhandled,
        }
    }

    /// Start a generation request for a block.
    pub fn begin_generation(&mut self, block_id: &BlockId) -> Option<GenerationTicket> {
        let block = self.document()?.block(block_id).cloned()?;
        let token = self.ledger.issue(block.id, RequestKind::Generation);
        Some(GenerationTicket {
            token,
            target: block.block_type,
            context: block.content,
        })
    }

    /// Apply a settled generation result.
    ///
    /// `Ok(true)` when the content was replaced, `Ok(false)` when the result
    /// was stale and dropped. A current failure leaves the content untouched.
    pub fn finish_generation(
        &mut self,
        token: &RequestToken,
        result: Result<String, GenerationError>,
    ) -> Result<bool, GenerationError> {
        if !self.settle(token) {
            return Ok(false);
        }
        let content = result?;
        Ok(self.write_content(&token.block_id, content, None))
    }

    /// Start an image read for a block.
    pub fn begin_image(&mut self, block_id: &BlockId) -> Option<RequestToken> {
        self.document()?.block(block_id)?;
        Some(self.ledger.issue(*block_id, RequestKind::Image))
    }

    /// Apply a settled image read (a data URI). See [`Self::finish_generation`].
    ///
    /// On success the block becomes an image block in the same commit that
    /// stores the data. A failed read leaves type and content untouched.
    pub fn finish_image(
        &mut self,
        token: &RequestToken,
        result: Result<String, ImageError>,
    ) -> Result<bool, ImageError> {
        if !self.settle(token) {
            return Ok(false);
        }
        let data = result?;
        Ok(self.write_typed(&token.block_id, BlockType::Image, data))
    }

    /// Retire `token`, `false` if its result is stale.
    fn settle(&mut self, token: &RequestToken) -> bool {
        if self.ledger.settle(token) {
            return true;
        }
        tracing::debug!(
            block = %token.block_id,
            kind = %token.kind,
            seq = token.seq(),
            "dropping stale result"
        );
        false
    }

    /// Generate content for a block and apply it.
    pub async fn generate(
        &mut self,
        generator: &ContentGenerator,
        block_id: &BlockId,
        prompt: &str,
    ) -> Result<bool, GenerationError> {
        let Some(ticket) = self.begin_generation(block_id) else {
            return Ok(false);
        };
        let result = generator
            .generate(prompt, ticket.target, Some(&ticket.context))
            .await;
        self.finish_generation(&ticket.token, result)
    }

    /// Read an image file into a block, making it an image block on success.
    pub async fn attach_image(
        &mut self,
        block_id: &BlockId,
        path: impl AsRef<Path>,
        max_bytes: u64,
    ) -> Result<bool, ImageError> {
        let Some(token) = self.begin_image(block_id) else {
            return Ok(false);
        };
        let result = image::ingest_file(path, max_bytes).await;
        self.finish_image(&token, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::shared_document_store;
    use crate::storage::MemoryStorage;
    use creat_types::UNTITLED;

    fn session() -> EditSession {
        let store = shared_document_store(MemoryStorage::with_blob("[]"));
        let id = store.create();
        EditSession::open(store, id).unwrap()
    }

    fn first_block(session: &EditSession) -> BlockId {
        session.document().unwrap().blocks[0].id
    }

    #[test]
    fn test_open_missing_document() {
        let store = shared_document_store(MemoryStorage::with_blob("[]"));
        assert!(EditSession::open(store, DocumentId::new()).is_none());
    }

    #[test]
    fn test_focus_starts_on_first_block() {
        let session = session();
        assert_eq!(session.focused(), Some(first_block(&session)));
    }

    #[test]
    fn test_title_follows_first_heading() {
        let mut session = session();
        let first = first_block(&session);

        session.change_type(&first, BlockType::Heading1);
        session.update_content(&first, "  Hello  ", None);
        assert_eq!(session.document().unwrap().title, "Hello");

        session.update_content(&first, "   ", None);
        assert_eq!(session.document().unwrap().title, UNTITLED);

        session.update_content(&first, "Back", None);
        session.change_type(&first, BlockType::Paragraph);
        assert_eq!(session.document().unwrap().title, UNTITLED);
    }

    #[test]
    fn test_enter_splits_paragraph() {
        let mut session = session();
        let first = first_block(&session);

        let KeyOutcome::Inserted(new) = session.handle_key(&first, Key::Enter, false) else {
            panic!("expected insert");
        };
        let doc = session.document().unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[1].id, new);
        assert_eq!(doc.blocks[1].block_type, BlockType::Paragraph);
        assert_eq!(session.focused(), Some(new));
    }

    #[test]
    fn test_shift_enter_and_code_enter_are_text() {
        let mut session = session();
        let first = first_block(&session);

        assert_eq!(session.handle_key(&first, Key::Enter, true), KeyOutcome::Unhandled);

        session.change_type(&first, BlockType::Code);
        assert_eq!(session.handle_key(&first, Key::Enter, false), KeyOutcome::Unhandled);
        assert_eq!(session.document().unwrap().blocks.len(), 1);
    }

    #[test]
    fn test_backspace_on_empty_removes_and_refocuses() {
        let mut session = session();
        let first = first_block(&session);
        session.update_content(&first, "keep", None);
        let second = session.append_block(BlockType::Paragraph).unwrap();

        assert_eq!(
            session.handle_key(&second, Key::Backspace, false),
            KeyOutcome::Removed { focus: Some(first) }
        );
        assert_eq!(session.document().unwrap().blocks.len(), 1);
        assert_eq!(session.focused(), Some(first));
    }

    #[test]
    fn test_backspace_on_unfocused_block_focuses_previous() {
        let mut session = session();
        let first = first_block(&session);
        session.update_content(&first, "a", None);
        let empty = session.append_block(BlockType::Paragraph).unwrap();
        let last = session.append_block(BlockType::Paragraph).unwrap();
        session.update_content(&last, "b", None);
        assert_eq!(session.focused(), Some(last));

        assert_eq!(
            session.handle_key(&empty, Key::Backspace, false),
            KeyOutcome::Removed { focus: Some(first) }
        );
        assert_eq!(session.focused(), Some(first));
    }

    #[test]
    fn test_removing_first_block_keeps_other_focus() {
        let mut session = session();
        let first = first_block(&session);
        let second = session.append_block(BlockType::Paragraph).unwrap();

        assert!(session.remove_block(&first));
        assert_eq!(session.focused(), Some(second));

        let third = session.append_block(BlockType::Paragraph).unwrap();
        session.focus(second);
        assert!(session.remove_block(&second));
        assert_eq!(session.focused(), None);
        assert_eq!(session.document().unwrap().blocks[0].id, third);
    }

    #[test]
    fn test_backspace_on_text_or_last_block() {
        let mut session = session();
        let first = first_block(&session);

        // Only block: removal is a no-op.
        assert_eq!(session.handle_key(&first, Key::Backspace, false), KeyOutcome::Unhandled);

        session.update_content(&first, "x", None);
        session.append_block(BlockType::Paragraph);
        assert_eq!(session.handle_key(&first, Key::Backspace, false), KeyOutcome::Unhandled);
        assert_eq!(session.document().unwrap().blocks.len(), 2);
    }

    #[test]
    fn test_unknown_block_is_noop() {
        let mut session = session();
        let ghost = BlockId::new();
        let before = session.document().unwrap();

        assert!(session.insert_after(&ghost, BlockType::Code).is_none());
        assert!(!session.remove_block(&ghost));
        assert!(!session.change_type(&ghost, BlockType::Code));
        assert!(!session.update_content(&ghost, "x", None));
        assert_eq!(session.handle_key(&ghost, Key::Enter, false), KeyOutcome::Unhandled);
        assert_eq!(session.document().unwrap().blocks, before.blocks);
    }

    #[test]
    fn test_metadata_patch_merges() {
        let mut session = session();
        let first = first_block(&session);
        session.change_type(&first, BlockType::Code);
        session.update_content(&first, "<p>a</p>", Some(&BlockMetadata::default().with_height(120)));
        session.update_content(&first, "<p>b</p>", Some(&BlockMetadata::default().with_language("html")));

        let block = session.document().unwrap().blocks[0].clone();
        assert_eq!(block.content, "<p>b</p>");
        assert_eq!(block.metadata.height, Some(120));
        assert_eq!(block.metadata.language.as_deref(), Some("html"));
    }

    #[test]
    fn test_generation_result_applies_when_current() {
        let mut session = session();
        let first = first_block(&session);
        session.update_content(&first, "draft", None);

        let ticket = session.begin_generation(&first).unwrap();
        assert_eq!(ticket.context, "draft");
        assert_eq!(ticket.target, BlockType::Paragraph);

        assert_eq!(session.finish_generation(&ticket.token, Ok("polished".into())), Ok(true));
        assert_eq!(session.document().unwrap().blocks[0].content, "polished");
        assert_eq!(session.ledger().pending(), 0);
    }

    #[test]
    fn test_manual_edit_beats_slow_generation() {
        let mut session = session();
        let first = first_block(&session);

        let ticket = session.begin_generation(&first).unwrap();
        session.update_content(&first, "typed by hand", None);

        assert_eq!(session.finish_generation(&ticket.token, Ok("late".into())), Ok(false));
        assert_eq!(session.document().unwrap().blocks[0].content, "typed by hand");
    }

    #[test]
    fn test_newer_request_wins() {
        let mut session = session();
        let first = first_block(&session);

        let old = session.begin_generation(&first).unwrap();
        let new = session.begin_image(&first).unwrap();

        assert!(
            session
                .finish_image(&new, Ok("data:image/png;base64,AA==".into()))
                .unwrap()
        );
        assert_eq!(session.finish_generation(&old.token, Ok("old".into())), Ok(false));
        assert_eq!(
            session.document().unwrap().blocks[0].content,
            "data:image/png;base64,AA=="
        );
    }

    #[test]
    fn test_failed_generation_keeps_content() {
        let mut session = session();
        let first = first_block(&session);
        session.update_content(&first, "original", None);

        let ticket = session.begin_generation(&first).unwrap();
        assert_eq!(
            session.finish_generation(&ticket.token, Err(GenerationError::Failed)),
            Err(GenerationError::Failed)
        );
        assert_eq!(session.document().unwrap().blocks[0].content, "original");
    }

    #[test]
    fn test_retype_drops_pending_generation() {
        let mut session = session();
        let first = first_block(&session);

        // Same type: the request stays current.
        let ticket = session.begin_generation(&first).unwrap();
        assert!(session.change_type(&first, BlockType::Paragraph));
        assert_eq!(session.ledger().pending(), 1);

        assert!(session.change_type(&first, BlockType::Code));
        assert_eq!(
            session.finish_generation(&ticket.token, Ok("Some prose.".into())),
            Ok(false)
        );
        let block = session.document().unwrap().blocks[0].clone();
        assert_eq!(block.block_type, BlockType::Code);
        assert_eq!(block.content, "");
    }

    #[test]
    fn test_failed_image_keeps_block() {
        let mut session = session();
        let first = first_block(&session);
        session.update_content(&first, "my paragraph", None);

        let token = session.begin_image(&first).unwrap();
        let err = session
            .finish_image(&token, Err(ImageError::UnsupportedType("text/plain".into())))
            .unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedType(_)));

        let block = session.document().unwrap().blocks[0].clone();
        assert_eq!(block.block_type, BlockType::Paragraph);
        assert_eq!(block.content, "my paragraph");
    }

    #[test]
    fn test_removed_block_drops_result() {
        let mut session = session();
        let first = first_block(&session);
        let second = session.append_block(BlockType::Image).unwrap();

        let token = session.begin_image(&second).unwrap();
        assert!(session.remove_block(&second));
        assert!(!session.finish_image(&token, Ok("data:x".into())).unwrap());
        assert_eq!(session.document().unwrap().blocks.len(), 1);
        assert_eq!(session.focused(), Some(first));
    }

    #[tokio::test]
    async fn test_attach_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        std::fs::write(&path, b"hello").unwrap();

        let mut session = session();
        let first = first_block(&session);

        assert!(session
            .attach_image(&first, &path, image::DEFAULT_MAX_BYTES)
            .await
            .unwrap());
        let block = session.document().unwrap().blocks[0].clone();
        assert_eq!(block.block_type, BlockType::Image);
        assert_eq!(block.content, "data:image/png;base64,aGVsbG8=");
    }
}
