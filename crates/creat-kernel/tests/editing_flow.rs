//! End-to-end editing against on-disk storage.

use std::sync::Arc;

use async_trait::async_trait;
use creat_kernel::seed::WELCOME_TITLE;
use creat_kernel::storage::STORAGE_KEY;
use creat_kernel::{
    BackendError, BackendResult, ContentGenerator, DocumentEvent, DocumentStore, EditSession,
    GenerationBackend, GenerationError, GenerationRequest, Key, KeyOutcome, LocalStorage,
    MemoryStorage, PreviewCache, render_post, shared_document_store,
};
use creat_types::{BlockType, UNTITLED};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("creat_kernel=debug")
        .with_test_writer()
        .try_init();
}

struct FixedBackend(&'static str);

#[async_trait]
impl GenerationBackend for FixedBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _request: GenerationRequest) -> BackendResult<String> {
        Ok(self.0.to_string())
    }
}

struct DownBackend;

#[async_trait]
impl GenerationBackend for DownBackend {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(&self, _request: GenerationRequest) -> BackendResult<String> {
        Err(BackendError::Unavailable("offline".into()))
    }
}

#[test]
fn first_run_seeds_welcome_document_on_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let store = DocumentStore::load(LocalStorage::new(dir.path()));
    let docs = store.list();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].title, WELCOME_TITLE);
    assert_eq!(docs[0].blocks.len(), 5);
    assert_eq!(docs[0].blocks[4].block_type, BlockType::Code);
    assert_eq!(docs[0].blocks[4].metadata.height, Some(200));

    let path = dir.path().join(format!("{STORAGE_KEY}.json"));
    assert!(path.exists(), "seeded collection should be flushed");

    // A second start reads the same collection back.
    let reloaded = DocumentStore::load(LocalStorage::new(dir.path()));
    assert_eq!(reloaded.list(), docs);
}

#[test]
fn write_a_post_and_reload_it() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = shared_document_store(LocalStorage::new(dir.path()));
    let id = store.create();
    assert_eq!(store.list()[0].id, id, "new documents go first");

    let mut session = EditSession::open(store.clone(), id).unwrap();
    let heading = session.document().unwrap().blocks[0].id;
    session.change_type(&heading, BlockType::Heading1);
    session.update_content(&heading, "Shipping CREAT", None);

    let KeyOutcome::Inserted(body) = session.handle_key(&heading, Key::Enter, false) else {
        panic!("enter on a heading should split");
    };
    session.update_content(&body, "Blocks all the way down.", None);
    let code = session.append_block(BlockType::Code).unwrap();
    session.update_content(&code, "<p id=\"x\">hi</p>", None);

    let doc = session.document().unwrap();
    assert_eq!(doc.title, "Shipping CREAT");
    assert_eq!(doc.blocks.len(), 3);

    let reloaded = DocumentStore::load(LocalStorage::new(dir.path()));
    assert_eq!(reloaded.get(&id), Some(doc.clone()));

    let summary = reloaded
        .summaries()
        .into_iter()
        .find(|s| s.id == id)
        .unwrap();
    assert_eq!(summary.preview, "Blocks all the way down.");
    assert!(summary.has_code);

    let html = render_post(&doc);
    assert!(html.contains("<h1>Shipping CREAT</h1>"));
    assert!(html.contains("<p>Blocks all the way down.</p>"));
    assert!(html.contains(r#"sandbox="allow-scripts""#));

    let mut previews = PreviewCache::default();
    assert_eq!(previews.sync(&doc), vec![code]);
}

#[test]
fn removing_a_middle_block_keeps_title() {
    let store = shared_document_store(MemoryStorage::with_blob("[]"));
    let id = store.create();
    let mut session = EditSession::open(store, id).unwrap();

    let a = session.document().unwrap().blocks[0].id;
    session.change_type(&a, BlockType::Heading1);
    session.update_content(&a, "A", None);
    let empty = session.append_block(BlockType::Paragraph).unwrap();
    let b = session.append_block(BlockType::Paragraph).unwrap();
    session.update_content(&b, "B", None);

    assert_eq!(
        session.handle_key(&empty, Key::Backspace, false),
        KeyOutcome::Removed { focus: Some(a) }
    );

    let doc = session.document().unwrap();
    let shape: Vec<_> = doc
        .blocks
        .iter()
        .map(|b| (b.block_type, b.content.as_str()))
        .collect();
    assert_eq!(
        shape,
        vec![(BlockType::Heading1, "A"), (BlockType::Paragraph, "B")]
    );
    assert_eq!(doc.title, "A");
}

#[test]
fn missing_document_update_leaves_blob_untouched() {
    let storage = MemoryStorage::new();
    let store = DocumentStore::load(storage.clone());
    let before = storage.blob().unwrap();

    let ghost = creat_types::DocumentId::new();
    assert!(!store.update(&ghost, creat_kernel::DocumentPatch::default().with_title("x")));
    assert_eq!(storage.blob().unwrap(), before);
}

#[tokio::test]
async fn generated_code_is_unfenced_and_applied() {
    init_tracing();
    let store = shared_document_store(MemoryStorage::with_blob("[]"));
    let mut events = store.subscribe();
    let id = store.create();
    assert_eq!(events.recv().await.unwrap(), DocumentEvent::Created { id });

    let mut session = EditSession::open(store.clone(), id).unwrap();
    let block = session.document().unwrap().blocks[0].id;
    session.change_type(&block, BlockType::Code);
    assert_eq!(events.recv().await.unwrap(), DocumentEvent::Updated { id });

    let generator = ContentGenerator::new(Arc::new(FixedBackend("```html\n<div>x</div>\n```")));
    assert_eq!(session.generate(&generator, &block, "a div").await, Ok(true));
    assert_eq!(session.document().unwrap().blocks[0].content, "<div>x</div>");
    assert_eq!(session.document().unwrap().title, UNTITLED);
}

#[tokio::test]
async fn failed_generation_changes_nothing() {
    let store = shared_document_store(MemoryStorage::with_blob("[]"));
    let id = store.create();
    let mut session = EditSession::open(store, id).unwrap();
    let block = session.document().unwrap().blocks[0].id;
    session.update_content(&block, "kept", None);

    let generator = ContentGenerator::new(Arc::new(DownBackend));
    assert_eq!(
        session.generate(&generator, &block, "rewrite").await,
        Err(GenerationError::Failed)
    );
    assert_eq!(session.document().unwrap().blocks[0].content, "kept");
    assert_eq!(session.ledger().pending(), 0);
}

#[test]
fn stale_result_after_manual_edit_is_dropped() {
    let store = shared_document_store(MemoryStorage::with_blob("[]"));
    let id = store.create();
    let mut session = EditSession::open(store, id).unwrap();
    let block = session.document().unwrap().blocks[0].id;

    let ticket = session.begin_generation(&block).unwrap();
    session.update_content(&block, "mine", None);
    assert_eq!(
        session.finish_generation(&ticket.token, Ok("theirs".into())),
        Ok(false)
    );
    assert_eq!(session.document().unwrap().blocks[0].content, "mine");
}

#[test]
fn malformed_blob_starts_empty_until_first_write() {
    init_tracing();
    let storage = MemoryStorage::with_blob("{not json");
    let store = DocumentStore::load(storage.clone());
    assert!(store.is_empty());
    assert_eq!(storage.blob().as_deref(), Some("{not json"));

    store.create();
    let blob = storage.blob().unwrap();
    assert!(blob.starts_with('['));
    assert_eq!(DocumentStore::load(storage).len(), 1);
}
