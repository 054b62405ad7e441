//! Processing of a single chunk within a stage.

use std::time::Duration;

use bf_core::{ChunkStatus, Error, Result, Stage};
use bf_db::{Chunk, ChunkStore};
use bf_engine::{CallSpec, GenerationClient, OutputFormat, PromptContext};

use crate::workdir::ChapterState;

/// A chunk queued for a stage, with its precomputed neighbour context.
#[derive(Debug, Clone)]
pub struct ChunkJob {
    pub chunk: Chunk,
    pub previous_context: String,
}

/// Runs one stage's prompt against one chunk and records the outcome.
#[derive(Clone)]
pub struct ChunkWorker {
    stage: Stage,
    store: ChunkStore,
    state: ChapterState,
    client: GenerationClient,
    template: String,
    /// Variables shared by every chunk of the stage.
    shared: PromptContext,
    timeout: Duration,
}

impl ChunkWorker {
    pub fn new(
        stage: Stage,
        store: ChunkStore,
        state: ChapterState,
        client: GenerationClient,
        template: impl Into<String>,
        shared: PromptContext,
        timeout: Duration,
    ) -> Self {
        Self {
            stage,
            store,
            state,
            client,
            template: template.into(),
            shared,
            timeout,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Text the stage works on: the source for discovery and translation,
    /// the current translation for reading.
    pub fn input_text<'a>(&self, chunk: &'a Chunk) -> &'a str {
        match self.stage {
            Stage::Discovery | Stage::Translation => &chunk.content_source,
            Stage::Reading => chunk.target_text(),
        }
    }

    pub fn build_prompt(&self, job: &ChunkJob) -> String {
        let mut ctx = self.shared.clone();
        ctx.set("text", self.input_text(&job.chunk));
        ctx.set("previous_context", job.previous_context.as_str());
        ctx.substitute(&self.template)
    }

    /// Process the chunk. Any error, including a panic in the engine call,
    /// marks it `{stage}_failed` with its content untouched and is returned
    /// to the caller.
    pub async fn process(&self, job: ChunkJob) -> Result<()> {
        let index = job.chunk.chunk_index;
        let worker = self.clone();
        let outcome = match tokio::spawn(async move { worker.run(job).await }).await {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("chunk task aborted: {e}"))),
        };
        match outcome {
            Ok(()) => {
                tracing::debug!(stage = %self.stage, chunk = index, "Chunk done");
                Ok(())
            }
            Err(e) => {
                tracing::error!(stage = %self.stage, chunk = index, "Chunk failed: {e}");
                if let Err(db) = self.store.set_status(index, ChunkStatus::failed(self.stage)) {
                    tracing::error!(stage = %self.stage, chunk = index, "Could not record failure: {db}");
                }
                Err(e)
            }
        }
    }

    async fn run(&self, job: ChunkJob) -> Result<()> {
        let index = job.chunk.chunk_index;
        self.store.set_status(index, ChunkStatus::in_progress(self.stage))?;

        let prompt = self.build_prompt(&job);
        let format = match self.stage {
            Stage::Discovery => OutputFormat::Json,
            Stage::Translation | Stage::Reading => OutputFormat::Text,
        };
        let spec = CallSpec::new(format!("{}#{index}", self.stage), format, self.timeout);
        let raw = self.client.generate(&prompt, &spec).await?;

        match self.stage {
            Stage::Discovery => {
                self.state.write_discovery(index, &raw)?;
                self.store.set_status(index, ChunkStatus::done(self.stage))?;
            }
            Stage::Translation | Stage::Reading => {
                let text = raw.trim();
                if text.is_empty() {
                    return Err(Error::Parse(format!("empty {} output", self.stage)));
                }
                let mut chunk = job.chunk;
                chunk.content_target = Some(text.to_string());
                chunk.status = ChunkStatus::done(self.stage);
                self.store.upsert(&chunk)?;
            }
        }
        Ok(())
    }
}
