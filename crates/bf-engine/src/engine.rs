//! The generation engine seam.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bf_core::config::EngineConfig;
use bf_core::{Error, Result};

use crate::command::ToolCommand;

/// Output mode requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// A text-generation backend.
///
/// Implementations perform exactly one bounded-time call per invocation and
/// report failures through [`Error`]: a non-zero exit as
/// [`Error::EngineExit`], a missed deadline as [`Error::EngineTimeout`].
/// Retry is the caller's job.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Run `prompt` and return the raw engine output.
    async fn generate(&self, prompt: &str, format: OutputFormat, timeout: Duration) -> Result<String>;
}

/// Engine backed by an LLM command-line tool.
///
/// Invokes `<program> -m <model> -p <prompt> --output-format <format>`.
#[derive(Debug, Clone)]
pub struct CliEngine {
    program: PathBuf,
    model: String,
}

impl CliEngine {
    pub fn new(program: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
        }
    }

    /// Build from config, resolving the program through `PATH`.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let program = which::which(&config.program).map_err(|e| {
            Error::tool(&config.program, format!("not found in PATH: {e}"))
        })?;
        tracing::debug!(program = %program.display(), model = %config.model, "Resolved generation engine");
        Ok(Self::new(program, config.model.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GenerationEngine for CliEngine {
    async fn generate(&self, prompt: &str, format: OutputFormat, timeout: Duration) -> Result<String> {
        let output = ToolCommand::new(self.program.clone())
            .args(["-m", self.model.as_str(), "-p", prompt])
            .args(["--output-format", format.as_str()])
            .timeout(timeout)
            .execute()
            .await?;
        Ok(output.stdout)
    }
}
