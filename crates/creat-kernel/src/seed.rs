//! The welcome document seeded into an empty collection on first load.

use creat_types::{Block, BlockMetadata, BlockType, Document, DocumentId, now_millis};

/// Title of the seeded document.
pub const WELCOME_TITLE: &str = "Welcome to CREAT";

/// Self-contained animated-box snippet shown in the seeded code block.
pub const WELCOME_SNIPPET: &str = r#"<style>
  .box {
    width: 100px;
    height: 100px;
    background: linear-gradient(45deg, #ff6b6b, #4ecdc4);
    border-radius: 12px;
    animation: spin 3s infinite linear;
    display: flex;
    align-items: center;
    justify-content: center;
    color: white;
    font-family: sans-serif;
    font-weight: bold;
  }
  @keyframes spin {
    100% { transform: rotate(360deg); }
  }
</style>
<div class="box">CREAT</div>"#;

/// Build the welcome document: H1, paragraph, H2, paragraph, code.
pub fn welcome_document() -> Document {
    let now = now_millis();
    Document {
        id: DocumentId::new(),
        title: WELCOME_TITLE.to_string(),
        created_at: now,
        updated_at: now,
        blocks: vec![
            Block::with_content(BlockType::Heading1, WELCOME_TITLE),
            Block::with_content(
                BlockType::Paragraph,
                "This is a block-based editor designed for developers and creators. \
                 You can write text, insert images, and most importantly, run code directly!",
            ),
            Block::with_content(BlockType::Heading2, "Live Code Execution"),
            Block::with_content(
                BlockType::Paragraph,
                "Try editing the code below to see the changes instantly.",
            ),
            Block::with_content(BlockType::Code, WELCOME_SNIPPET)
                .with_metadata(BlockMetadata::default().with_height(200)),
        ],
    }
}
