//! bf-pipeline: the chapter translation pipeline.
//!
//! A chapter is split into chunks which move through three per-chunk stages
//! (term discovery, translation, reading) and a final whole-chapter
//! proofreading pass. [`StagePipeline`] drives a run, persisting chunk state
//! in the chunk store and stage checkpoints in the chapter's state
//! directory.

pub mod approval;
pub mod diff;
pub mod executor;
pub mod glossary;
pub mod pool;
pub mod prompts;
pub mod proofread;
pub mod repair;
pub mod splitter;
pub mod terms;
pub mod workdir;
pub mod worker;

pub use approval::{Approval, AutoApprove, TermApprover, TsvApprover};
pub use diff::{apply_diffs, DiffDirective, DiffReport};
pub use executor::{ChapterFiles, PipelineSettings, RunOptions, RunOutcome, StagePipeline};
pub use pool::{PoolReport, WorkerPool};
pub use prompts::{PromptKind, PromptSet};
pub use proofread::GlobalProofreader;
pub use splitter::{Fragment, ParagraphSplitter, Splitter};
pub use terms::{CandidateTerm, TermCollector};
pub use workdir::{ChapterState, Checkpoint, LockGuard};
pub use worker::{ChunkJob, ChunkWorker};
