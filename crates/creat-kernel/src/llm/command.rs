//! Generation through an external program.
//!
//! The program receives the combined prompt on stdin and the model and
//! system instruction in the environment (`CREAT_MODEL`,
//! `CREAT_SYSTEM_INSTRUCTION`), and prints the generated text on stdout. Any
//! CLI wrapper around a hosted model fits this shape.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{BackendError, BackendResult, GenerationBackend, GenerationRequest};

/// Default time limit for one generation call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Backend that runs a program per request.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandBackend {
    /// Run `program` with `args` for each request.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Parse a whitespace-separated command line (`"llm -m gemini"`).
    ///
    /// Returns `None` for an empty command line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    /// Override the time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, request: &GenerationRequest) -> BackendResult<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("CREAT_MODEL", &request.model)
            .env("CREAT_SYSTEM_INSTRUCTION", &request.system_instruction)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BackendError::Unavailable(format!("{}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.contents.as_bytes())
                .await
                .map_err(|e| BackendError::NetworkError(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::ApiError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| BackendError::ApiError(format!("output is not utf-8: {e}")))
    }
}

#[async_trait]
impl GenerationBackend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    async fn generate(&self, request: GenerationRequest) -> BackendResult<String> {
        tokio::time::timeout(self.timeout, self.run(&request))
            .await
            .map_err(|_| BackendError::NetworkError(format!("timed out after {:?}", self.timeout)))?
    }
}
