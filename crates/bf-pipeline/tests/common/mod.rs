//! Shared harness for pipeline integration tests.
//!
//! [`ScriptedEngine`] answers deterministically based on the first line of
//! the prompt, which the test prompt templates set to the stage name.
//! [`Harness`] owns a temporary chapter with three paragraphs and the
//! stores a pipeline run works against.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bf_core::{Error, Result};
use bf_db::{ChunkStore, GlossaryStore};
use bf_engine::{AuditLog, GenerationClient, GenerationEngine, OutputFormat, RateLimiter, RetryPolicy};
use bf_pipeline::{
    ChapterFiles, ChapterState, ParagraphSplitter, PipelineSettings, PromptKind, PromptSet,
    StagePipeline, TermApprover,
};
use parking_lot::Mutex;

pub const SOURCE: &str = "alpha one.\n\nbravo two.\n\ncharlie three.";

pub const EMPTY_DISCOVERY: &str = r#"{"characters": {}, "terminology": {}, "expressions": {}}"#;

/// Deterministic stand-in for the generation engine.
///
/// - `DISCOVER` prompts get the configured discovery reply.
/// - `TRANSLATE` prompts get `T(<text>)`.
/// - `READ` prompts get `R(<text>)`.
/// - `GLOBAL` prompts get the configured global reply.
///
/// A stage/needle pair registered with [`ScriptedEngine::fail_on`] makes
/// matching calls fail permanently, [`ScriptedEngine::exit_on`] makes them
/// fail with a retryable non-zero exit, and [`ScriptedEngine::panic_on`]
/// makes them panic.
pub struct ScriptedEngine {
    pub prompts: Mutex<Vec<String>>,
    discovery_reply: Mutex<String>,
    global_reply: Mutex<String>,
    failures: Mutex<Vec<(String, String, Failure)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Permanent,
    Transient,
    Panic,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            discovery_reply: Mutex::new(EMPTY_DISCOVERY.to_string()),
            global_reply: Mutex::new("[]".to_string()),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn set_discovery_reply(&self, reply: &str) {
        *self.discovery_reply.lock() = reply.to_string();
    }

    pub fn set_global_reply(&self, reply: &str) {
        *self.global_reply.lock() = reply.to_string();
    }

    pub fn fail_on(&self, kind: &str, needle: &str) {
        self.script(kind, needle, Failure::Permanent);
    }

    pub fn exit_on(&self, kind: &str, needle: &str) {
        self.script(kind, needle, Failure::Transient);
    }

    pub fn panic_on(&self, kind: &str, needle: &str) {
        self.script(kind, needle, Failure::Panic);
    }

    fn script(&self, kind: &str, needle: &str, failure: Failure) {
        self.failures
            .lock()
            .push((kind.to_string(), needle.to_string(), failure));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Recorded prompts of one kind.
    pub fn calls(&self, kind: &str) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter(|p| prompt_kind(p) == kind)
            .cloned()
            .collect()
    }
}

fn prompt_kind(prompt: &str) -> &str {
    let head = prompt.lines().next().unwrap_or_default();
    head.split('|').next().unwrap_or_default()
}

#[async_trait]
impl GenerationEngine for ScriptedEngine {
    async fn generate(&self, prompt: &str, _format: OutputFormat, _timeout: Duration) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        let kind = prompt_kind(prompt);
        let text = prompt.split_once('\n').map(|(_, rest)| rest).unwrap_or_default();

        let failure = self
            .failures
            .lock()
            .iter()
            .find(|(k, needle, _)| k == kind && text.contains(needle.as_str()))
            .map(|(_, _, failure)| *failure);
        match failure {
            Some(Failure::Permanent) => return Err(Error::tool("scripted", format!("{kind} refused"))),
            Some(Failure::Transient) => return Err(Error::engine_exit("exit status: 1", "overloaded")),
            Some(Failure::Panic) => panic!("scripted engine panicked on {kind}"),
            None => {}
        }

        Ok(match kind {
            "DISCOVER" => self.discovery_reply.lock().clone(),
            "TRANSLATE" => format!("T({text})"),
            "READ" => format!("R({text})"),
            "GLOBAL" => self.global_reply.lock().clone(),
            other => return Err(Error::Internal(format!("unexpected prompt kind {other}"))),
        })
    }
}

pub fn test_prompts() -> PromptSet {
    let mut prompts = PromptSet::default();
    prompts.set(PromptKind::TermDiscovery, "DISCOVER\n{text}");
    prompts.set(PromptKind::Translation, "TRANSLATE|{previous_context}|{glossary}\n{text}");
    prompts.set(PromptKind::Proofreading, "READ|{previous_context}\n{text}");
    prompts.set(PromptKind::GlobalProofreading, "GLOBAL");
    prompts
}

pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        target_chunk_size: 5,
        max_part_chars: 100,
        max_concurrent: 4,
        chunk_timeout: Duration::from_secs(5),
        global_timeout: Duration::from_secs(5),
    }
}

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub engine: Arc<ScriptedEngine>,
    pub store: ChunkStore,
    pub glossary: GlossaryStore,
    pub files: ChapterFiles,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source_file = dir.path().join("volume-01/source/ch01.txt");
        std::fs::create_dir_all(source_file.parent().unwrap()).unwrap();
        std::fs::write(&source_file, SOURCE).unwrap();

        let store = ChunkStore::open(&dir.path().join("volume-01/.state/chunks.db"), "ch01").unwrap();
        let glossary = GlossaryStore::in_memory("ja", "ru").unwrap();

        Self {
            files: ChapterFiles {
                name: "ch01".into(),
                source_file,
                output_file: dir.path().join("volume-01/output/ch01.txt"),
            },
            dir,
            engine: Arc::new(ScriptedEngine::new()),
            store,
            glossary,
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("volume-01/.state/ch01")
    }

    pub fn state(&self) -> ChapterState {
        ChapterState::open(self.state_dir()).unwrap()
    }

    pub fn client(&self) -> GenerationClient {
        GenerationClient::new(
            self.engine.clone(),
            Arc::new(RateLimiter::new(1000.0).unwrap()),
            Arc::new(AuditLog::disabled()),
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
            },
        )
    }

    pub fn pipeline(&self) -> StagePipeline {
        StagePipeline::new(
            self.files.clone(),
            self.store.clone(),
            self.glossary.clone(),
            self.state(),
            self.client(),
        )
        .with_prompts(test_prompts())
        .with_settings(test_settings())
        .with_splitter(ParagraphSplitter::new())
    }

    pub fn pipeline_with(&self, approver: Arc<dyn TermApprover>) -> StagePipeline {
        self.pipeline().with_approver(approver)
    }

    pub fn output(&self) -> String {
        std::fs::read_to_string(&self.files.output_file).unwrap()
    }
}
