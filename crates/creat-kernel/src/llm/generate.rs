//! Prompt construction and output cleanup around a [`GenerationBackend`].

use std::sync::Arc;

use creat_types::BlockType;

use super::{GenerationBackend, GenerationError, GenerationRequest};

/// Default model identifier sent with every request.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const BASE_PERSONA: &str = "You are a helpful assistant for a documentation editor.";

const CODE_REFINEMENT: &str = " You are an expert frontend engineer. Generate valid HTML/CSS/JS \
code that can run directly in an iframe. Do not use markdown backticks. Just return the raw code.";

const PROSE_REFINEMENT: &str =
    " You are a professional technical writer. Keep it concise and engaging.";

/// System instruction for a target block type.
pub fn system_instruction(target: BlockType) -> String {
    let refinement = match target {
        BlockType::Code => CODE_REFINEMENT,
        _ => PROSE_REFINEMENT,
    };
    format!("{BASE_PERSONA}{refinement}")
}

/// Combined prompt text. A missing or empty context is sent as `None`.
pub fn compose_contents(prompt: &str, context: Option<&str>) -> String {
    let context = context.filter(|c| !c.is_empty()).unwrap_or("None");
    format!("Context: {context}\n\nTask: {prompt}")
}

/// Info strings recognised even when code follows on the same line.
const FENCE_LANGUAGES: &[&str] = &["javascript", "html", "css", "svg", "xml", "js"];

/// Remove a surrounding markdown fence from generated code.
///
/// Strips a leading ```` ``` ```` (with an optional one-word info string such
/// as `html` on the same line) and a trailing ```` ``` ````, then trims.
/// A known language word is dropped even when no newline follows it
/// (```` ```html<div> ````). Text without fences is only trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let (first_line, remainder) = match rest.find('\n') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        let is_info_string = first_line
            .trim()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_'));
        body = if is_info_string {
            remainder
        } else {
            strip_language(rest)
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim().to_string()
}

fn strip_language(text: &str) -> &str {
    for lang in FENCE_LANGUAGES {
        let Some(head) = text.get(..lang.len()) else {
            continue;
        };
        let tail = &text[lang.len()..];
        if head.eq_ignore_ascii_case(lang)
            && !tail.starts_with(|c: char| c.is_ascii_alphanumeric())
        {
            return tail;
        }
    }
    text
}

/// Generates block content through an injected backend.
#[derive(Clone)]
pub struct ContentGenerator {
    backend: Arc<dyn GenerationBackend>,
    model: String,
}

impl std::fmt::Debug for ContentGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentGenerator")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .finish()
    }
}

impl ContentGenerator {
    /// Create a generator using [`DEFAULT_MODEL`].
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Get the model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request that [`generate`](Self::generate) would send.
    pub fn build_request(
        &self,
        prompt: &str,
        target: BlockType,
        context: Option<&str>,
    ) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            contents: compose_contents(prompt, context),
            system_instruction: system_instruction(target),
        }
    }

    /// Generate content for a block of type `target`.
    ///
    /// `context` is typically the block's current content. Code output has
    /// fences stripped; prose is returned untouched. Backend errors are logged
    /// and collapsed into [`GenerationError::Failed`].
    pub async fn generate(
        &self,
        prompt: &str,
        target: BlockType,
        context: Option<&str>,
    ) -> Result<String, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        let request = self.build_request(prompt, target, context);
        tracing::debug!(
            backend = self.backend.name(),
            model = %self.model,
            target = %target,
            "sending generation request"
        );

        let text = self.backend.generate(request).await.map_err(|e| {
            tracing::error!(backend = self.backend.name(), "generation failed: {e}");
            GenerationError::Failed
        })?;

        Ok(match target {
            BlockType::Code => strip_code_fences(&text),
            _ => text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{BackendError, BackendResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Backend that replays a canned reply and records what it was sent.
    struct ScriptedBackend {
        reply: BackendResult<String>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(BackendError::NetworkError("connection reset".into())),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: GenerationRequest) -> BackendResult<String> {
            self.seen.lock().push(request);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(BackendError::ApiError(e.to_string())),
            }
        }
    }

    #[test]
    fn test_system_instruction_by_target() {
        let code = system_instruction(BlockType::Code);
        assert!(code.starts_with(BASE_PERSONA));
        assert!(code.contains("iframe"));
        assert!(code.contains("Do not use markdown backticks"));

        for ty in [BlockType::Paragraph, BlockType::Heading1, BlockType::Image] {
            let prose = system_instruction(ty);
            assert!(prose.contains("concise and engaging"));
            assert!(!prose.contains("iframe"));
        }
    }

    #[test]
    fn test_compose_contents() {
        assert_eq!(
            compose_contents("write a haiku", Some("old text")),
            "Context: old text\n\nTask: write a haiku"
        );
        assert_eq!(
            compose_contents("write", None),
            "Context: None\n\nTask: write"
        );
        assert_eq!(compose_contents("write", Some("")), "Context: None\n\nTask: write");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```html\n<div>x</div>\n```"), "<div>x</div>");
        assert_eq!(strip_code_fences("```\n<p>a</p>\n```\n"), "<p>a</p>");
        assert_eq!(strip_code_fences("```js\nlet a = 1;\n```"), "let a = 1;");
        assert_eq!(strip_code_fences("```<b>x</b>```"), "<b>x</b>");
        assert_eq!(strip_code_fences("```html<div>x</div>```"), "<div>x</div>");
        assert_eq!(strip_code_fences("```HTML <p>y</p>\n```"), "<p>y</p>");
        // Only a whole known word counts.
        assert_eq!(strip_code_fences("```htmlx<i>```"), "htmlx<i>");
        assert_eq!(strip_code_fences("  <b>plain</b>\n"), "<b>plain</b>");
        // Inner fences are left alone.
        assert_eq!(
            strip_code_fences("<pre>```</pre>\n<p>x</p>"),
            "<pre>```</pre>\n<p>x</p>"
        );
    }

    #[tokio::test]
    async fn test_generate_code_strips_fences() {
        let backend = ScriptedBackend::ok("```html\n<div>x</div>\n```");
        let generator = ContentGenerator::new(backend.clone());

        let out = generator
            .generate("a box", BlockType::Code, Some("<p>old</p>"))
            .await
            .unwrap();
        assert_eq!(out, "<div>x</div>");

        let seen = backend.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, DEFAULT_MODEL);
        assert_eq!(seen[0].contents, "Context: <p>old</p>\n\nTask: a box");
        assert_eq!(seen[0].system_instruction, system_instruction(BlockType::Code));
    }

    #[tokio::test]
    async fn test_generate_prose_is_untouched() {
        let backend = ScriptedBackend::ok("```not code```  ");
        let generator = ContentGenerator::new(backend).with_model("other-model");
        let out = generator
            .generate("intro", BlockType::Paragraph, None)
            .await
            .unwrap();
        assert_eq!(out, "```not code```  ");
        assert_eq!(generator.model(), "other-model");
    }

    #[tokio::test]
    async fn test_generate_failure_is_generic() {
        let generator = ContentGenerator::new(ScriptedBackend::failing());
        let err = generator
            .generate("anything", BlockType::Code, None)
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Failed);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_not_sent() {
        let backend = ScriptedBackend::ok("unused");
        let generator = ContentGenerator::new(backend.clone());
        let err = generator
            .generate("   ", BlockType::Paragraph, None)
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::EmptyPrompt);
        assert!(backend.seen.lock().is_empty());
    }
}
