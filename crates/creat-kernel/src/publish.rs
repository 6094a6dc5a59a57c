//! Read-only post rendering.
//!
//! Turns a document into a standalone HTML page: a header with the title and
//! creation date, then one element per block. Text is always escaped; code
//! blocks get a sandboxed live preview followed by their source listing.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use creat_types::{Block, BlockType, Document};

use crate::html::{escape_attr, escape_text};
use crate::preview::PreviewRenderer;

/// Renders documents as posts.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostRenderer {
    preview: PreviewRenderer,
}

impl PostRenderer {
    /// Create a renderer whose code previews use `preview`.
    pub fn new(preview: PreviewRenderer) -> Self {
        Self { preview }
    }

    /// Render the full page.
    pub fn render(&self, document: &Document) -> String {
        let mut body = String::new();
        for block in &document.blocks {
            if let Some(html) = self.render_block(block) {
                body.push_str("      ");
                body.push_str(&html);
                body.push('\n');
            }
        }

        let title = escape_text(&document.title);
        let date = format_date(document.created_at);
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
  </head>
  <body>
    <main>
      <header>
        <h1>{title}</h1>
        <time>{date}</time>
      </header>
      <article>
{body}      </article>
    </main>
  </body>
</html>
"#
        )
    }

    /// Render one block, or `None` if it shows nothing.
    ///
    /// Empty blocks are skipped. Level-one headings render as `<h2>` since
    /// the page header already holds the `<h1>`.
    pub fn render_block(&self, block: &Block) -> Option<String> {
        if block.content.is_empty() {
            return None;
        }
        let text = || escape_text(&block.content);
        let html = match block.block_type {
            BlockType::Heading1 | BlockType::Heading2 => format!("<h2>{}</h2>", text()),
            BlockType::Heading3 => format!("<h3>{}</h3>", text()),
            BlockType::Paragraph => format!("<p>{}</p>", text()),
            BlockType::Image => {
                let mut figure = format!(
                    r#"<figure><img src="{}" alt="Article content">"#,
                    escape_attr(&block.content)
                );
                if let Some(caption) = block.metadata.caption.as_deref().filter(|c| !c.is_empty()) {
                    let _ = write!(figure, "<figcaption>{}</figcaption>", escape_text(caption));
                }
                figure.push_str("</figure>");
                figure
            }
            BlockType::Code => {
                let surface = self.preview.render_block(block);
                format!(
                    r#"<section class="code-block"><div class="live-preview">{}</div><pre><code>{}</code></pre></section>"#,
                    surface.to_iframe_html(),
                    text()
                )
            }
        };
        Some(html)
    }
}

/// Render a document with default preview settings.
pub fn render_post(document: &Document) -> String {
    PostRenderer::default().render(document)
}

/// Format a millisecond timestamp as "October 19, 2026" (UTC).
pub fn format_date(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%B %-d, %Y").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use creat_types::BlockMetadata;

    fn doc(blocks: Vec<Block>) -> Document {
        let mut doc = Document::new();
        doc.title = "A <Post>".into();
        doc.blocks = blocks;
        doc
    }

    #[test]
    fn test_format_date() {
        // 2024-03-05T12:00:00Z
        assert_eq!(format_date(1_709_640_000_000), "March 5, 2024");
        assert_eq!(format_date(0), "January 1, 1970");
    }

    #[test]
    fn test_header_escapes_title() {
        let html = render_post(&doc(vec![Block::new(BlockType::Paragraph)]));
        assert!(html.contains("<h1>A &lt;Post&gt;</h1>"));
        assert!(html.contains("<title>A &lt;Post&gt;</title>"));
        assert!(html.contains("<time>"));
    }

    #[test]
    fn test_block_mapping() {
        let renderer = PostRenderer::default();
        let render = |ty, content: &str| renderer.render_block(&Block::with_content(ty, content));

        assert_eq!(render(BlockType::Heading1, "Top").unwrap(), "<h2>Top</h2>");
        assert_eq!(render(BlockType::Heading2, "Mid").unwrap(), "<h2>Mid</h2>");
        assert_eq!(render(BlockType::Heading3, "Low").unwrap(), "<h3>Low</h3>");
        assert_eq!(
            render(BlockType::Paragraph, "x < y").unwrap(),
            "<p>x &lt; y</p>"
        );
    }

    #[test]
    fn test_empty_blocks_are_skipped() {
        let renderer = PostRenderer::default();
        for ty in BlockType::ALL {
            assert!(renderer.render_block(&Block::new(ty)).is_none(), "{ty}");
        }

        let html = render_post(&doc(vec![
            Block::with_content(BlockType::Paragraph, "kept"),
            Block::new(BlockType::Paragraph),
            Block::new(BlockType::Image),
        ]));
        assert_eq!(html.matches("<p>").count(), 1);
        assert!(!html.contains("<figure>"));
    }

    #[test]
    fn test_image_figure() {
        let block = Block::with_content(BlockType::Image, "data:image/png;base64,AAAA")
            .with_metadata(BlockMetadata::default().with_caption("A & B"));
        let html = PostRenderer::default().render_block(&block).unwrap();
        assert!(html.starts_with(r#"<figure><img src="data:image/png;base64,AAAA""#));
        assert!(html.contains("<figcaption>A &amp; B</figcaption>"));
    }

    #[test]
    fn test_code_block_has_preview_and_source() {
        let block = Block::with_content(BlockType::Code, "<button>Go</button>")
            .with_metadata(BlockMetadata::default().with_height(200));
        let html = PostRenderer::default().render_block(&block).unwrap();

        assert!(html.contains(r#"sandbox="allow-scripts""#));
        assert!(html.contains("height:200px"));
        assert!(html.contains("<pre><code>&lt;button&gt;Go&lt;/button&gt;</code></pre>"));
        // The only raw copy of the code lives inside the escaped srcdoc.
        assert!(!html.contains("<button>Go</button>"));
    }

    #[test]
    fn test_code_block_default_height() {
        let block = Block::with_content(BlockType::Code, "<p>x</p>");
        let html = PostRenderer::new(PreviewRenderer::new(320))
            .render_block(&block)
            .unwrap();
        assert!(html.contains("height:320px"));
    }
}
