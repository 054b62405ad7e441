use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bf_core::config::SeriesConfig;
use bf_core::paths::SeriesPaths;
use bf_engine::{AuditLog, CliEngine, GenerationClient, RateLimiter, RetryPolicy};
use bf_pipeline::{AutoApprove, RunOptions, RunOutcome, StagePipeline, TermApprover, TsvApprover};

/// Environment variable that forces automatic term approval.
pub const AUTO_APPROVE_ENV: &str = "BOOKFORGE_AUTO_APPROVE";

pub struct TranslateArgs<'a> {
    pub chapter: &'a Path,
    pub resume: bool,
    pub force: bool,
    pub debug: bool,
    pub auto_approve: bool,
}

fn auto_approve_from_env() -> bool {
    std::env::var(AUTO_APPROVE_ENV)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

pub async fn run(paths: &SeriesPaths, config: &SeriesConfig, args: TranslateArgs<'_>) -> Result<()> {
    let chapter = paths.resolve_chapter(args.chapter)?;
    tracing::info!(
        chapter = %chapter.name,
        volume = %chapter.volume.name(),
        "Translating chapter"
    );

    let engine = CliEngine::from_config(&config.engine).context("generation engine unavailable")?;
    let limiter = RateLimiter::new(config.engine.max_rate)?;
    let audit = if args.debug {
        let dir = chapter.volume.logs_dir();
        tracing::info!(dir = %dir.display(), "Writing engine audit logs");
        AuditLog::open(&dir)?
    } else {
        AuditLog::disabled()
    };
    let client = GenerationClient::new(
        Arc::new(engine),
        Arc::new(limiter),
        Arc::new(audit),
        RetryPolicy::from_config(&config.engine),
    );

    let approver: Arc<dyn TermApprover> = if args.auto_approve || auto_approve_from_env() {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TsvApprover::stdin())
    };

    let pipeline = StagePipeline::open(paths, config, &chapter, client)?.with_approver(approver);
    let outcome = pipeline
        .run(RunOptions {
            resume: args.resume,
            force: args.force,
        })
        .await
        .with_context(|| format!("translation of {} did not start or aborted", chapter.name))?;

    match outcome {
        RunOutcome::Completed { output } => {
            println!("Translation complete: {}", output.display());
            Ok(())
        }
        RunOutcome::StageFailed { stage, failed } => {
            anyhow::bail!("{stage} failed for {failed} chunk(s); rerun with --resume to retry them")
        }
        RunOutcome::ApprovalCancelled => {
            anyhow::bail!("term approval cancelled; rerun to review the terms again")
        }
    }
}
