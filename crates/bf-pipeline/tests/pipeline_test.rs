//! End-to-end runs of the stage pipeline against the scripted engine.

mod common;

use std::io::Cursor;
use std::sync::Arc;

use bf_core::{ChunkStatus, Error, Stage};
use bf_db::Chunk;
use bf_pipeline::{AutoApprove, Checkpoint, RunOptions, RunOutcome, TsvApprover};
use common::Harness;

const RESUME: RunOptions = RunOptions {
    resume: true,
    force: false,
};

fn expected_output() -> String {
    ["R(T(alpha one.))", "R(T(bravo two.))", "R(T(charlie three.))"].join("\n\n")
}

#[tokio::test]
async fn three_chunks_end_to_end() {
    let h = Harness::new();
    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();

    let RunOutcome::Completed { output } = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!(output, h.files.output_file);
    assert_eq!(h.output(), expected_output());

    let state = h.state();
    for checkpoint in Checkpoint::ALL {
        assert!(state.is_complete(checkpoint), "{} missing", checkpoint.name());
    }
    assert!(!state.lock_path().exists());

    let chunks = h.store.all().unwrap();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.status == ChunkStatus::done(Stage::Reading)));
    assert_eq!(h.engine.calls("DISCOVER").len(), 3);
    assert_eq!(h.engine.calls("GLOBAL").len(), 1);
}

#[tokio::test]
async fn previous_chunk_context_passed_to_prompts() {
    let h = Harness::new();
    h.pipeline().run(RunOptions::default()).await.unwrap();

    let translate = h.engine.calls("TRANSLATE");
    assert!(translate.contains(&"TRANSLATE||[]\nalpha one.".to_string()));
    assert!(translate.contains(&"TRANSLATE|alpha one.|[]\nbravo two.".to_string()));

    let read = h.engine.calls("READ");
    assert!(read.contains(&"READ|T(bravo two.)\nT(charlie three.)".to_string()));
}

#[tokio::test]
async fn completed_run_is_not_repeated() {
    let h = Harness::new();
    h.pipeline().run(RunOptions::default()).await.unwrap();
    let calls = h.engine.prompts.lock().len();

    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.engine.prompts.lock().len(), calls);
    assert_eq!(h.output(), expected_output());
}

#[tokio::test]
async fn failed_chunk_aborts_stage_and_resume_retries_only_it() {
    let h = Harness::new();
    h.engine.fail_on("TRANSLATE", "bravo");

    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::StageFailed {
            stage: Stage::Translation,
            failed: 1
        }
    );
    let state = h.state();
    assert!(state.is_complete(Checkpoint::Discovery));
    assert!(!state.is_complete(Checkpoint::Translation));
    assert!(!state.lock_path().exists());
    assert!(!h.files.output_file.exists());

    let failed = h.store.get(1).unwrap().unwrap();
    assert_eq!(failed.status, ChunkStatus::failed(Stage::Translation));
    assert_eq!(failed.content_source, "bravo two.");
    assert!(failed.content_target.is_none());
    for i in [0, 2] {
        assert_eq!(
            h.store.get(i).unwrap().unwrap().status,
            ChunkStatus::done(Stage::Translation)
        );
    }

    // Without resume the failed chunk is not retried.
    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::StageFailed { stage: Stage::Translation, .. }));
    assert_eq!(h.engine.calls("TRANSLATE").len(), 3);

    h.engine.clear_failures();
    let outcome = h.pipeline().run(RESUME).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let translate = h.engine.calls("TRANSLATE");
    assert_eq!(translate.len(), 4);
    assert!(translate[3].ends_with("\nbravo two."));
    assert_eq!(h.engine.calls("DISCOVER").len(), 3);
    assert_eq!(h.output(), expected_output());
}

#[tokio::test]
async fn chunk_fails_after_exhausting_retries() {
    let h = Harness::new();
    h.engine.exit_on("TRANSLATE", "bravo");

    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::StageFailed {
            stage: Stage::Translation,
            failed: 1
        }
    );

    let translate = h.engine.calls("TRANSLATE");
    let bravo = translate.iter().filter(|p| p.ends_with("\nbravo two.")).count();
    assert_eq!(bravo, 3);
    assert_eq!(translate.len(), 5);
    assert_eq!(
        h.store.get(1).unwrap().unwrap().status,
        ChunkStatus::failed(Stage::Translation)
    );
    assert!(!h.state().is_complete(Checkpoint::Translation));

    h.engine.clear_failures();
    let outcome = h.pipeline().run(RESUME).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.engine.calls("TRANSLATE").len(), 6);
    assert_eq!(h.output(), expected_output());
}

#[tokio::test]
async fn panicking_engine_marks_chunk_failed() {
    let h = Harness::new();
    h.engine.panic_on("DISCOVER", "bravo");

    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::StageFailed {
            stage: Stage::Discovery,
            failed: 1
        }
    );
    assert_eq!(
        h.store.get(1).unwrap().unwrap().status,
        ChunkStatus::failed(Stage::Discovery)
    );
    assert!(!h.state().lock_path().exists());

    h.engine.clear_failures();
    let outcome = h.pipeline().run(RESUME).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.output(), expected_output());
}

#[tokio::test]
async fn interrupted_chunk_requeued_on_resume() {
    let h = Harness::new();
    let sources = ["alpha one.", "bravo two.", "charlie three."];
    let chunks: Vec<Chunk> = sources
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let mut chunk = Chunk::new("ch01", i as i64, *text);
            if i == 1 {
                chunk.status = ChunkStatus::in_progress(Stage::Translation);
            } else {
                chunk.status = ChunkStatus::done(Stage::Translation);
                chunk.content_target = Some(format!("T({text})"));
            }
            chunk
        })
        .collect();
    h.store.upsert_all(&chunks).unwrap();

    let state = h.state();
    state.mark_complete(Checkpoint::Discovery).unwrap();
    std::fs::write(state.lock_path(), "424242").unwrap();

    let err = h.pipeline().run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::Locked { .. }));
    assert_eq!(
        h.store.get(1).unwrap().unwrap().status,
        ChunkStatus::in_progress(Stage::Translation)
    );

    let outcome = h.pipeline().run(RESUME).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    assert!(h.engine.calls("DISCOVER").is_empty());
    let translate = h.engine.calls("TRANSLATE");
    assert_eq!(translate.len(), 1);
    assert!(translate[0].ends_with("\nbravo two."));
    assert_eq!(h.store.get(1).unwrap().unwrap().content_source, "bravo two.");
    assert_eq!(h.output(), expected_output());
    assert!(!state.lock_path().exists());
}

#[tokio::test]
async fn assembly_uses_only_finished_chunks() {
    let h = Harness::new();
    let chunks: Vec<Chunk> = ["alpha one.", "bravo two.", "charlie three."]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let mut chunk = Chunk::new("ch01", i as i64, *text);
            chunk.content_target = Some(format!("R({text})"));
            chunk.status = if i == 1 {
                ChunkStatus::done(Stage::Translation)
            } else {
                ChunkStatus::done(Stage::Reading)
            };
            chunk
        })
        .collect();
    h.store.upsert_all(&chunks).unwrap();
    let state = h.state();
    for checkpoint in Checkpoint::ALL {
        state.mark_complete(checkpoint).unwrap();
    }

    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.output(), "R(alpha one.)\n\nR(charlie three.)");
    assert!(h.engine.prompts.lock().is_empty());
}

#[tokio::test]
async fn held_lock_blocks_run() {
    let h = Harness::new();
    let _guard = h.state().acquire_lock(false).unwrap();

    let err = h.pipeline().run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::Locked { .. }));
    assert!(h.engine.prompts.lock().is_empty());
    assert!(h.store.all().unwrap().is_empty());
}

#[tokio::test]
async fn global_proofreading_edits_applied() {
    let h = Harness::new();
    h.engine
        .set_global_reply(r#"{"response": "```json\n[{\"chunk_index\": 1, \"find\": \"bravo\", \"replace\": \"BRAVO\"}, {\"chunk_index\": 9, \"find\": \"x\", \"replace\": \"y\"}]\n```"}"#);

    h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(
        h.output(),
        ["R(T(alpha one.))", "R(T(BRAVO two.))", "R(T(charlie three.))"].join("\n\n")
    );
    assert_eq!(
        h.store.get(1).unwrap().unwrap().status,
        ChunkStatus::done(Stage::Reading)
    );
}

#[tokio::test]
async fn global_proofreading_failure_keeps_text() {
    let h = Harness::new();
    h.engine.set_global_reply("I have no comments on this chapter.");

    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.output(), expected_output());
    assert!(h.state().is_complete(Checkpoint::GlobalReading));

    let h = Harness::new();
    h.engine.fail_on("GLOBAL", "Chunk 0");
    let outcome = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.engine.calls("GLOBAL").len(), 1);
    assert_eq!(h.output(), expected_output());
}

#[tokio::test]
async fn discovered_terms_reach_translation_prompts() {
    let h = Harness::new();
    h.engine.set_discovery_reply(
        r#"{"characters": {"alpha": {"name": {"jp": "アルファ", "ru": "Альфа"}, "description": "lead"}}, "terminology": {}, "expressions": {}}"#,
    );

    let outcome = h.pipeline_with(Arc::new(AutoApprove)).run(RunOptions::default()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let term = h.glossary.get("アルファ").unwrap().unwrap();
    assert_eq!(term.term_target, "Альфа");
    assert_eq!(term.comment, "lead");

    let translate = h.engine.calls("TRANSLATE");
    assert!(translate.iter().all(|p| p.contains(r#""term_source":"アルファ""#)));
}

#[tokio::test]
async fn known_terms_are_not_offered_again() {
    let h = Harness::new();
    h.glossary.upsert("アルファ", "Альфа", "").unwrap();
    h.engine.set_discovery_reply(
        r#"{"characters": {"alpha": {"name": {"jp": "アルファ", "ru": "Альфа"}}}, "terminology": {}, "expressions": {}}"#,
    );

    // An approver that would fail if it were asked.
    let approver = Arc::new(TsvApprover::with_input(Cursor::new(Vec::new())));
    let outcome = h.pipeline_with(approver).run(RunOptions::default()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
}

#[tokio::test]
async fn cancelled_approval_stops_before_translation() {
    let h = Harness::new();
    h.engine.set_discovery_reply(
        r#"{"terminology": {"gate": {"term_jp": "門", "term_ru": "Врата"}}}"#,
    );

    let approver = Arc::new(TsvApprover::with_input(Cursor::new(b"q\n".to_vec())));
    let outcome = h.pipeline_with(approver).run(RunOptions::default()).await.unwrap();
    assert_eq!(outcome, RunOutcome::ApprovalCancelled);

    let state = h.state();
    assert!(!state.is_complete(Checkpoint::Discovery));
    assert!(!state.lock_path().exists());
    assert!(state.pending_terms_path().exists());
    assert!(h.engine.calls("TRANSLATE").is_empty());
    assert_eq!(h.glossary.count().unwrap(), 0);

    // The next run reuses the cached discovery output.
    let outcome = h.pipeline_with(Arc::new(AutoApprove)).run(RunOptions::default()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.engine.calls("DISCOVER").len(), 3);
    assert_eq!(h.glossary.get("門").unwrap().unwrap().term_target, "Врата");
}

#[tokio::test]
async fn force_restarts_from_scratch() {
    let h = Harness::new();
    h.pipeline().run(RunOptions::default()).await.unwrap();

    std::fs::write(&h.files.source_file, "delta four.").unwrap();
    let outcome = h
        .pipeline()
        .run(RunOptions {
            resume: false,
            force: true,
        })
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.store.count().unwrap(), 1);
    assert_eq!(h.output(), "R(T(delta four.))");
    assert_eq!(h.engine.calls("DISCOVER").len(), 4);
}

#[tokio::test]
async fn empty_chapter_is_rejected() {
    let h = Harness::new();
    std::fs::write(&h.files.source_file, "\n\n").unwrap();
    let err = h.pipeline().run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!h.state().lock_path().exists());
}
