//! CLI end-to-end tests
//!
//! Tests for the bookforge command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the bookforge binary
#[allow(deprecated)]
fn bookforge_cmd() -> Command {
    let mut cmd = Command::cargo_bin("bookforge").unwrap();
    cmd.env_remove("BOOKFORGE_AUTO_APPROVE");
    cmd
}

/// Create a series called `Test` under `dir` and return its root.
fn init_series(dir: &Path) -> PathBuf {
    bookforge_cmd()
        .current_dir(dir)
        .args(["init", "Test"])
        .assert()
        .success();
    dir.join("Test")
}

#[test]
fn test_cli_no_args_shows_help() {
    bookforge_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    bookforge_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bookforge"))
        .stdout(predicate::str::contains("translate"));
}

#[test]
fn test_cli_translate_help() {
    bookforge_cmd()
        .args(["translate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--resume"))
        .stdout(predicate::str::contains("--auto-approve"));
}

#[test]
fn test_cli_init_creates_series() {
    let dir = tempdir().unwrap();
    let root = init_series(dir.path());

    assert!(root.join("bookforge.toml").is_file());
    assert!(root.join("style_guide.md").is_file());
    assert!(root.join("world_info.md").is_file());
    assert!(root.join("glossary.db").is_file());
    assert!(root.join("prompts/translation.txt").is_file());
    assert!(root.join("volume-01/source").is_dir());
    assert!(root.join("volume-01/output").is_dir());

    let config = fs::read_to_string(root.join("bookforge.toml")).unwrap();
    assert!(config.contains("name = \"Test\""));
    assert!(config.contains("max_concurrent = 50"));
}

#[test]
fn test_cli_init_languages() {
    let dir = tempdir().unwrap();
    bookforge_cmd()
        .current_dir(dir.path())
        .args(["init", "Novel", "--source-lang", "en", "--target-lang", "de"])
        .assert()
        .success();
    let config = fs::read_to_string(dir.path().join("Novel/bookforge.toml")).unwrap();
    assert!(config.contains("source_lang = \"en\""));
    assert!(config.contains("target_lang = \"de\""));
}

#[test]
fn test_cli_init_existing_dir_fails() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("Test")).unwrap();
    bookforge_cmd()
        .current_dir(dir.path())
        .args(["init", "Test"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_cli_outside_series_fails() {
    let dir = tempdir().unwrap();
    bookforge_cmd()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bookforge.toml"));
}

#[test]
fn test_cli_glossary_import_list_export() {
    let dir = tempdir().unwrap();
    let root = init_series(dir.path());

    let tsv = dir.path().join("terms.tsv");
    fs::write(
        &tsv,
        "# source_term\ttarget_term\tcomment\n魔王\tПовелитель демонов\tmain antagonist\n勇者\tГерой\n\nbroken line\n",
    )
    .unwrap();

    bookforge_cmd()
        .current_dir(&root)
        .args(["glossary", "import"])
        .arg(&tsv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 terms"));

    bookforge_cmd()
        .current_dir(&root)
        .args(["glossary", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("魔王 → Повелитель демонов (main antagonist)"))
        .stdout(predicate::str::contains("勇者 → Герой"));

    bookforge_cmd()
        .current_dir(&root)
        .args(["glossary", "export"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# source_term\ttarget_term\tcomment"))
        .stdout(predicate::str::contains("勇者\tГерой\t"));

    let out = dir.path().join("export.tsv");
    bookforge_cmd()
        .args(["--series"])
        .arg(&root)
        .args(["glossary", "export", "-o"])
        .arg(&out)
        .assert()
        .success();
    assert!(fs::read_to_string(&out).unwrap().contains("魔王\tПовелитель демонов\tmain antagonist"));
}

#[test]
fn test_cli_status_new_series() {
    let dir = tempdir().unwrap();
    let root = init_series(dir.path());
    fs::write(root.join("volume-01/source/ch01.txt"), "本文。").unwrap();

    bookforge_cmd()
        .current_dir(root.join("volume-01"))
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Series: Test"))
        .stdout(predicate::str::contains("Glossary: 0 terms"))
        .stdout(predicate::str::contains("volume-01: 1 chapters (not started)"));
}

#[test]
fn test_cli_translate_missing_engine_fails() {
    let dir = tempdir().unwrap();
    let root = init_series(dir.path());
    let config = root.join("bookforge.toml");
    let text = fs::read_to_string(&config).unwrap();
    fs::write(&config, text.replace("program = \"gemini\"", "program = \"bookforge-no-such-engine\"")).unwrap();
    let chapter = root.join("volume-01/source/ch01.txt");
    fs::write(&chapter, "本文。").unwrap();

    bookforge_cmd()
        .current_dir(&root)
        .arg("translate")
        .arg(&chapter)
        .assert()
        .failure()
        .stderr(predicate::str::contains("generation engine unavailable"));
}

#[test]
fn test_cli_translate_rejects_misplaced_chapter() {
    let dir = tempdir().unwrap();
    let root = init_series(dir.path());
    let stray = root.join("ch01.txt");
    fs::write(&stray, "本文。").unwrap();

    bookforge_cmd()
        .current_dir(&root)
        .arg("translate")
        .arg(&stray)
        .assert()
        .failure()
        .stderr(predicate::str::contains("source"));
}

#[cfg(unix)]
#[test]
fn test_cli_translate_with_stub_engine() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let root = init_series(dir.path());

    // Arguments: -m <model> -p <prompt> --output-format <format>
    let engine = dir.path().join("fake-engine.sh");
    fs::write(
        &engine,
        "#!/bin/sh\nif [ \"$6\" = \"json\" ]; then echo '[]'; else echo 'translated'; fi\n",
    )
    .unwrap();
    fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

    let config = root.join("bookforge.toml");
    let text = fs::read_to_string(&config).unwrap();
    fs::write(
        &config,
        text.replace("program = \"gemini\"", &format!("program = \"{}\"", engine.display()))
            .replace("max_rate = 2.0", "max_rate = 50.0"),
    )
    .unwrap();

    let chapter = root.join("volume-01/source/ch01.txt");
    fs::write(&chapter, "短い章です。").unwrap();

    bookforge_cmd()
        .current_dir(&root)
        .args(["translate", "--auto-approve", "--debug"])
        .arg(&chapter)
        .assert()
        .success()
        .stdout(predicate::str::contains("Translation complete"));

    let output = fs::read_to_string(root.join("volume-01/output/ch01.txt")).unwrap();
    assert_eq!(output, "translated");
    assert!(root.join("volume-01/.state/logs/workers_input.log").is_file());
    assert!(root.join("volume-01/.state/ch01/.stage_global_reading_complete").is_file());
    assert!(!root.join("volume-01/.state/ch01/.lock").exists());

    bookforge_cmd()
        .current_dir(&root)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("ch01: 1 chunks [reading_done: 1] (output written)"));
}
