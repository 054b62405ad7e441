//! Stage pipeline: runs one chapter through discovery, translation,
//! reading and global proofreading, then assembles the output file.
//!
//! Every stage is checkpointed on disk. A rerun skips completed stages and
//! only processes chunks that are still pending, so an interrupted or
//! failed run can be resumed without redoing finished work.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bf_core::config::{EngineConfig, SeriesConfig, SplitterConfig, WorkersConfig};
use bf_core::paths::{ChapterRef, SeriesPaths, STYLE_GUIDE_FILE, WORLD_INFO_FILE};
use bf_core::{ChunkStatus, Error, Phase, Result, Stage};
use bf_db::{Chunk, ChunkStore, GlossaryStore};
use bf_engine::{GenerationClient, PromptContext};
use serde_json::json;

use crate::approval::{Approval, AutoApprove, TermApprover};
use crate::pool::WorkerPool;
use crate::proofread::GlobalProofreader;
use crate::prompts::{PromptKind, PromptSet};
use crate::splitter::{ParagraphSplitter, Splitter};
use crate::terms::{CandidateTerm, TermCollector};
use crate::workdir::{ChapterState, Checkpoint};
use crate::worker::{ChunkJob, ChunkWorker};

/// Flags controlling a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Take over a leftover lock and requeue interrupted or failed chunks.
    pub resume: bool,
    /// Discard all chunk rows and checkpoints of the chapter first.
    pub force: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { output: PathBuf },
    /// A stage left chunks unfinished; no checkpoint was written for it.
    StageFailed { stage: Stage, failed: usize },
    /// The operator cancelled term approval.
    ApprovalCancelled,
}

/// Numeric run settings.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub target_chunk_size: usize,
    pub max_part_chars: usize,
    pub max_concurrent: usize,
    pub chunk_timeout: Duration,
    pub global_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        let splitter = SplitterConfig::default();
        Self {
            target_chunk_size: splitter.target_chunk_size,
            max_part_chars: splitter.max_part_chars,
            max_concurrent: WorkersConfig::default().max_concurrent,
            chunk_timeout: engine.timeout(),
            global_timeout: engine.global_timeout(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &SeriesConfig) -> Self {
        Self {
            target_chunk_size: config.splitter.target_chunk_size,
            max_part_chars: config.splitter.max_part_chars,
            max_concurrent: config.workers.max_concurrent,
            chunk_timeout: config.engine.timeout(),
            global_timeout: config.engine.global_timeout(),
        }
    }
}

/// The source chapter and where its translation goes.
#[derive(Debug, Clone)]
pub struct ChapterFiles {
    pub name: String,
    pub source_file: PathBuf,
    pub output_file: PathBuf,
}

pub struct StagePipeline {
    chapter: ChapterFiles,
    store: ChunkStore,
    glossary: GlossaryStore,
    state: ChapterState,
    client: GenerationClient,
    prompts: PromptSet,
    approver: Arc<dyn TermApprover>,
    splitter: Box<dyn Splitter>,
    settings: PipelineSettings,
    style_guide: String,
    world_info: String,
}

impl StagePipeline {
    pub fn new(
        chapter: ChapterFiles,
        store: ChunkStore,
        glossary: GlossaryStore,
        state: ChapterState,
        client: GenerationClient,
    ) -> Self {
        Self {
            chapter,
            store,
            glossary,
            state,
            client,
            prompts: PromptSet::default(),
            approver: Arc::new(AutoApprove),
            splitter: Box::new(ParagraphSplitter::new()),
            settings: PipelineSettings::default(),
            style_guide: String::new(),
            world_info: String::new(),
        }
    }

    /// Wire a pipeline for `chapter` using the series layout: the volume
    /// chunk database, the series glossary, prompt overrides and context
    /// files.
    pub fn open(
        paths: &SeriesPaths,
        config: &SeriesConfig,
        chapter: &ChapterRef,
        client: GenerationClient,
    ) -> Result<Self> {
        let volume = &chapter.volume;
        let store = ChunkStore::open(&volume.chunks_db(), chapter.name.as_str())?;
        let glossary = GlossaryStore::open(
            &paths.glossary_db(),
            config.series.source_lang.as_str(),
            config.series.target_lang.as_str(),
        )?;
        let state = ChapterState::open(volume.chapter_state_dir(&chapter.name))?;

        let read_context = |name: &str| -> Result<String> {
            match paths.context_file(volume, name) {
                Some(path) => Ok(std::fs::read_to_string(path)?),
                None => Ok(String::new()),
            }
        };
        let style_guide = read_context(STYLE_GUIDE_FILE)?;
        let world_info = read_context(WORLD_INFO_FILE)?;

        let files = ChapterFiles {
            name: chapter.name.clone(),
            source_file: chapter.source_file.clone(),
            output_file: volume.output_file(&chapter.name),
        };
        Ok(Self::new(files, store, glossary, state, client)
            .with_prompts(PromptSet::load(&paths.prompts_dir())?)
            .with_splitter(ParagraphSplitter::new().with_min_size(config.splitter.min_chunk_size))
            .with_settings(PipelineSettings::from_config(config))
            .with_context(style_guide, world_info))
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_approver(mut self, approver: Arc<dyn TermApprover>) -> Self {
        self.approver = approver;
        self
    }

    pub fn with_splitter(mut self, splitter: impl Splitter + 'static) -> Self {
        self.splitter = Box::new(splitter);
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_context(mut self, style_guide: impl Into<String>, world_info: impl Into<String>) -> Self {
        self.style_guide = style_guide.into();
        self.world_info = world_info.into();
        self
    }

    pub fn chapter(&self) -> &ChapterFiles {
        &self.chapter
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn state(&self) -> &ChapterState {
        &self.state
    }

    /// Run every outstanding stage of the chapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Locked`] when another run holds the chapter and
    /// `resume` is not set, and any storage or I/O error. Chunk-level
    /// failures are reported through [`RunOutcome::StageFailed`] instead.
    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome> {
        let _lock = self.state.acquire_lock(options.resume)?;
        tracing::info!(chapter = %self.chapter.name, resume = options.resume, force = options.force, "Starting run");

        if options.force {
            let removed = self.store.reset()?;
            self.state.reset()?;
            tracing::info!(chapter = %self.chapter.name, chunks = removed, "Discarded previous state");
        }
        if options.resume {
            let requeued = self.store.requeue_interrupted()?;
            if requeued > 0 {
                tracing::info!(chapter = %self.chapter.name, chunks = requeued, "Requeued interrupted chunks");
            }
        }
        if self.store.count()? == 0 {
            self.split()?;
        }

        if let Some(outcome) = self.discovery().await? {
            return Ok(outcome);
        }
        for stage in [Stage::Translation, Stage::Reading] {
            if let Some(outcome) = self.chunk_stage(stage).await? {
                return Ok(outcome);
            }
        }
        self.global_reading().await?;

        let output = self.assemble()?;
        tracing::info!(chapter = %self.chapter.name, output = %output.display(), "Run complete");
        Ok(RunOutcome::Completed { output })
    }

    fn split(&self) -> Result<()> {
        let text = std::fs::read_to_string(&self.chapter.source_file)?;
        let fragments = self.splitter.split(
            &text,
            self.settings.target_chunk_size,
            self.settings.max_part_chars,
        );
        if fragments.is_empty() {
            return Err(Error::Validation(format!(
                "chapter {} has no text",
                self.chapter.source_file.display()
            )));
        }
        let chunks: Vec<Chunk> = fragments
            .into_iter()
            .map(|f| Chunk::new(self.chapter.name.as_str(), f.index, f.text))
            .collect();
        self.store.upsert_all(&chunks)?;
        tracing::info!(chapter = %self.chapter.name, chunks = chunks.len(), "Split chapter");
        Ok(())
    }

    /// Glossary of the language pair as a JSON array.
    fn glossary_json(&self) -> Result<String> {
        let terms: Vec<_> = self
            .glossary
            .list()?
            .into_iter()
            .map(|t| json!({"term_source": t.term_source, "term_target": t.term_target, "comment": t.comment}))
            .collect();
        Ok(serde_json::Value::Array(terms).to_string())
    }

    fn shared_context(&self) -> Result<PromptContext> {
        Ok(PromptContext::new()
            .with_var("glossary", self.glossary_json()?)
            .with_var("style_guide", self.style_guide.as_str())
            .with_var("world_info", self.world_info.as_str()))
    }

    /// Pending chunks of `stage` paired with the text of the chunk before
    /// them.
    fn jobs(&self, stage: Stage, pending: Vec<Chunk>) -> Result<Vec<ChunkJob>> {
        let all = self.store.all()?;
        let by_index: HashMap<i64, &Chunk> = all.iter().map(|c| (c.chunk_index, c)).collect();
        Ok(pending
            .into_iter()
            .map(|chunk| {
                let previous_context = by_index
                    .get(&(chunk.chunk_index - 1))
                    .map(|prev| match stage {
                        Stage::Discovery => "",
                        Stage::Translation => prev.content_source.as_str(),
                        Stage::Reading => prev.target_text(),
                    })
                    .unwrap_or_default()
                    .to_string();
                ChunkJob {
                    chunk,
                    previous_context,
                }
            })
            .collect())
    }

    /// Run the pool over the pending chunks of `stage`. Returns the number
    /// of chunks of the stage left failed or in progress.
    async fn process_pending(&self, stage: Stage) -> Result<usize> {
        let pending = self.store.with_status(ChunkStatus::pending(stage))?;
        if pending.is_empty() {
            tracing::info!(stage = %stage, "No pending chunks");
        } else {
            let jobs = self.jobs(stage, pending)?;
            let worker = Arc::new(ChunkWorker::new(
                stage,
                self.store.clone(),
                self.state.clone(),
                self.client.clone(),
                self.prompts.get(PromptKind::for_stage(stage)),
                self.shared_context()?,
                self.settings.chunk_timeout,
            ));

            tracing::info!(stage = %stage, chunks = jobs.len(), "Processing stage");
            let report = WorkerPool::new(self.settings.max_concurrent)
                .run(jobs, move |job| {
                    let worker = Arc::clone(&worker);
                    async move { worker.process(job).await }
                })
                .await;
            tracing::info!(
                stage = %stage,
                succeeded = report.succeeded,
                failed = report.failed,
                "Stage pool finished"
            );
        }

        let unfinished = self.store.with_status(ChunkStatus::new(stage, Phase::Failed))?.len()
            + self.store.with_status(ChunkStatus::new(stage, Phase::InProgress))?.len();
        Ok(unfinished)
    }

    fn stage_failed(&self, stage: Stage, failed: usize) -> RunOutcome {
        tracing::error!(
            chapter = %self.chapter.name,
            stage = %stage,
            failed,
            "Stage incomplete; rerun with --resume to retry"
        );
        RunOutcome::StageFailed { stage, failed }
    }

    /// Advance done chunks and write the checkpoint. A checkpoint found on
    /// entry only repeats the advance.
    fn finish_stage(&self, stage: Stage) -> Result<()> {
        let moved = self.store.advance(stage)?;
        tracing::debug!(stage = %stage, chunks = moved, "Advanced chunks");
        let checkpoint = Checkpoint::from(stage);
        if !self.state.is_complete(checkpoint) {
            self.state.mark_complete(checkpoint)?;
        }
        Ok(())
    }

    async fn chunk_stage(&self, stage: Stage) -> Result<Option<RunOutcome>> {
        if self.state.is_complete(Checkpoint::from(stage)) {
            tracing::info!(stage = %stage, "Stage already complete");
            self.finish_stage(stage)?;
            return Ok(None);
        }
        let failed = self.process_pending(stage).await?;
        if failed > 0 {
            return Ok(Some(self.stage_failed(stage, failed)));
        }
        self.finish_stage(stage)?;
        Ok(None)
    }

    async fn discovery(&self) -> Result<Option<RunOutcome>> {
        let stage = Stage::Discovery;
        if self.state.is_complete(Checkpoint::Discovery) {
            tracing::info!(stage = %stage, "Stage already complete");
            self.finish_stage(stage)?;
            return Ok(None);
        }
        let failed = self.process_pending(stage).await?;
        if failed > 0 {
            return Ok(Some(self.stage_failed(stage, failed)));
        }

        let candidates = self.new_candidates()?;
        if candidates.is_empty() {
            tracing::info!("No new terms discovered");
        } else {
            let approver = Arc::clone(&self.approver);
            let buffer = self.state.pending_terms_path();
            let approval = tokio::task::spawn_blocking(move || approver.approve(candidates, &buffer))
                .await
                .map_err(|e| Error::Internal(format!("approval task join error: {e}")))??;

            match approval {
                Approval::Cancelled => return Ok(Some(RunOutcome::ApprovalCancelled)),
                Approval::Approved(terms) => {
                    let rows: Vec<_> = terms
                        .iter()
                        .map(|t| self.glossary.term(&t.source, &t.target, &t.comment))
                        .collect();
                    self.glossary.upsert_all(&rows)?;
                    tracing::info!(terms = rows.len(), "Glossary updated");
                }
            }
        }

        self.finish_stage(stage)?;
        Ok(None)
    }

    /// Discovered terms whose source is not in the glossary yet.
    fn new_candidates(&self) -> Result<Vec<CandidateTerm>> {
        let responses = self.state.read_discoveries()?;
        let collector = TermCollector::collect(responses.iter().map(|(i, raw)| (*i, raw.as_str())));
        tracing::info!(
            responses = responses.len(),
            rejected = collector.rejected(),
            terms = collector.terms().len(),
            "Collected discovery results"
        );

        let mut fresh = Vec::new();
        for candidate in collector.candidates() {
            if self.glossary.get(&candidate.source)?.is_none() {
                fresh.push(candidate);
            }
        }
        Ok(fresh)
    }

    async fn global_reading(&self) -> Result<()> {
        if self.state.is_complete(Checkpoint::GlobalReading) {
            tracing::info!("Global proofreading already complete");
            return Ok(());
        }
        let chunks = self.store.all()?;
        let proofreader = GlobalProofreader::new(
            self.client.clone(),
            self.prompts.get(PromptKind::GlobalProofreading),
            self.settings.global_timeout,
        );

        if let Some(report) = proofreader.proofread(&chunks, &self.shared_context()?).await {
            let updated: Vec<Chunk> = report
                .chunks
                .into_iter()
                .map(|mut c| {
                    c.status = ChunkStatus::done(Stage::Reading);
                    c
                })
                .collect();
            self.store.upsert_all(&updated)?;
        }
        self.state.mark_complete(Checkpoint::GlobalReading)
    }

    /// Join the final text of every `reading_done` chunk in index order
    /// into the output file.
    fn assemble(&self) -> Result<PathBuf> {
        let finished = ChunkStatus::done(Stage::Reading);
        let chunks = self.store.all()?;
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            match chunk.content_target.as_deref() {
                Some(text) if chunk.status == finished => parts.push(text),
                _ => tracing::warn!(
                    chunk = chunk.chunk_index,
                    status = %chunk.status,
                    "Chunk not finished, leaving it out"
                ),
            }
        }

        let output = &self.chapter.output_file;
        if let Some(dir) = output.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(output, parts.join("\n\n"))?;
        Ok(output.clone())
    }

    /// Output path the run writes to.
    pub fn output_file(&self) -> &Path {
        &self.chapter.output_file
    }
}
