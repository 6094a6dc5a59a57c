//! Sandboxed preview of code blocks.
//!
//! A code block's content is embedded verbatim into a small standalone HTML
//! document that is shown through an `<iframe srcdoc>` with
//! `sandbox="allow-scripts"`. Scripts run, but without `allow-same-origin`
//! the frame gets an opaque origin: it cannot reach the host page's DOM,
//! cookies, or storage. Uncaught errors are caught by a handler installed in
//! `<head>`, before any user code runs, and printed inside the frame.

use std::collections::HashMap;

use creat_types::{Block, BlockId, BlockType, Document};

use crate::html::escape_attr;

/// Preview height when neither the block nor the caller picks one.
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 300;

/// The only sandbox capability granted to previews.
pub const SANDBOX_POLICY: &str = "allow-scripts";

const DOCUMENT_HEAD: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <style>
      body { margin: 0; padding: 1rem; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif; }
    </style>
    <script>
      (function () {
        function report(message) {
          var box = document.createElement('div');
          box.setAttribute('style', 'color:red; background:#fee; padding:8px; border-radius:4px; margin-top:8px; font-family:monospace;');
          box.textContent = 'Runtime Error: ' + message;
          (document.body || document.documentElement).appendChild(box);
        }
        window.onerror = function (message) {
          report(message);
          return true;
        };
        window.addEventListener('unhandledrejection', function (event) {
          report(event.reason && event.reason.message ? event.reason.message : String(event.reason));
        });
      })();
    </script>
  </head>
  <body>
"#;

const DOCUMENT_TAIL: &str = r#"
  </body>
</html>
"#;

/// One rendered preview: an isolated document plus its frame settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewSurface {
    /// Full HTML document for the frame's `srcdoc`.
    pub srcdoc: String,
    /// Frame height in pixels.
    pub height: u32,
}

impl PreviewSurface {
    /// Sandbox attribute value for the frame.
    pub fn sandbox(&self) -> &'static str {
        SANDBOX_POLICY
    }

    /// The `<iframe>` element, ready to drop into a host page.
    pub fn to_iframe_html(&self) -> String {
        format!(
            r#"<iframe title="Code Preview" sandbox="{sandbox}" style="width:100%;height:{height}px;border:none" srcdoc="{srcdoc}"></iframe>"#,
            sandbox = SANDBOX_POLICY,
            height = self.height,
            srcdoc = escape_attr(&self.srcdoc),
        )
    }
}

/// Wraps user code into preview surfaces.
#[derive(Clone, Copy, Debug)]
pub struct PreviewRenderer {
    default_height: u32,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_HEIGHT)
    }
}

impl PreviewRenderer {
    /// Create a renderer with a default frame height.
    pub fn new(default_height: u32) -> Self {
        Self { default_height }
    }

    /// Default frame height.
    pub fn default_height(&self) -> u32 {
        self.default_height
    }

    /// Render `code` into an isolated surface.
    pub fn render(&self, code: &str, height: Option<u32>) -> PreviewSurface {
        let mut srcdoc =
            String::with_capacity(DOCUMENT_HEAD.len() + code.len() + DOCUMENT_TAIL.len());
        srcdoc.push_str(DOCUMENT_HEAD);
        srcdoc.push_str(code);
        srcdoc.push_str(DOCUMENT_TAIL);
        PreviewSurface {
            srcdoc,
            height: height.unwrap_or(self.default_height),
        }
    }

    /// Render a block's content using its preferred height, if any.
    pub fn render_block(&self, block: &Block) -> PreviewSurface {
        self.render(&block.content, block.metadata.height)
    }
}

/// A preview that reloads only when its code changes.
#[derive(Clone, Debug)]
pub struct PreviewFrame {
    code: String,
    surface: PreviewSurface,
    renders: u64,
}

impl PreviewFrame {
    /// Render the initial surface.
    pub fn new(renderer: &PreviewRenderer, code: &str, height: Option<u32>) -> Self {
        Self {
            code: code.to_string(),
            surface: renderer.render(code, height),
            renders: 1,
        }
    }

    /// Apply new code and height. Returns `true` if the surface was reloaded.
    ///
    /// Identical code keeps the current surface (only the height is updated),
    /// so a running preview is not restarted.
    pub fn update(&mut self, renderer: &PreviewRenderer, code: &str, height: Option<u32>) -> bool {
        let height = height.unwrap_or(renderer.default_height());
        if self.code == code {
            self.surface.height = height;
            return false;
        }
        self.code = code.to_string();
        self.surface = renderer.render(code, Some(height));
        self.renders += 1;
        true
    }

    /// Current surface.
    pub fn surface(&self) -> &PreviewSurface {
        &self.surface
    }

    /// How many times this frame has rendered.
    pub fn renders(&self) -> u64 {
        self.renders
    }
}

/// Preview frames for every code block of one document, keyed by block id.
#[derive(Debug, Default)]
pub struct PreviewCache {
    renderer: PreviewRenderer,
    frames: HashMap<BlockId, PreviewFrame>,
}

impl PreviewCache {
    /// Create an empty cache.
    pub fn new(renderer: PreviewRenderer) -> Self {
        Self {
            renderer,
            frames: HashMap::new(),
        }
    }

    /// Bring frames in line with the document's code blocks.
    ///
    /// Returns the ids of frames that were created or reloaded. Frames for
    /// blocks that are gone or no longer code are dropped.
    pub fn sync(&mut self, document: &Document) -> Vec<BlockId> {
        let mut reloaded = Vec::new();
        let code_blocks: Vec<&Block> = document
            .blocks
            .iter()
            .filter(|b| b.block_type == BlockType::Code)
            .collect();

        self.frames
            .retain(|id, _| code_blocks.iter().any(|b| &b.id == id));

        for block in code_blocks {
            match self.frames.get_mut(&block.id) {
                Some(frame) => {
                    if frame.update(&self.renderer, &block.content, block.metadata.height) {
                        reloaded.push(block.id);
                    }
                }
                None => {
                    self.frames.insert(
                        block.id,
                        PreviewFrame::new(&self.renderer, &block.content, block.metadata.height),
                    );
                    reloaded.push(block.id);
                }
            }
        }
        reloaded
    }

    /// Surface for a code block, if one has been rendered.
    pub fn get(&self, id: &BlockId) -> Option<&PreviewSurface> {
        self.frames.get(id).map(|f| f.surface())
    }

    /// Number of live frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
