//! Embedded SQL migrations and runner.
//!
//! Two independent schemas exist: the per-volume chunk store and the
//! series-wide glossary. Each has its own ordered migration list; a
//! `schema_migrations` table tracks which versions have been applied.

use bf_core::{Error, Result};
use rusqlite::Connection;

/// Chunk store V1: one row per (chapter, chunk index).
const CHUNKS_V1: &str = r#"
CREATE TABLE chunks (
    chapter_name   TEXT    NOT NULL,
    chunk_index    INTEGER NOT NULL,
    content_source TEXT    NOT NULL,
    content_target TEXT,
    status         TEXT    NOT NULL DEFAULT 'discovery_pending',
    updated_at     TEXT    NOT NULL,
    PRIMARY KEY (chapter_name, chunk_index)
);

CREATE INDEX idx_chunks_status ON chunks(chapter_name, status);
"#;

/// Glossary V1: one row per (source term, language pair).
const GLOSSARY_V1: &str = r#"
CREATE TABLE glossary (
    term_source TEXT NOT NULL,
    term_target TEXT NOT NULL,
    source_lang TEXT NOT NULL,
    target_lang TEXT NOT NULL,
    comment     TEXT NOT NULL DEFAULT '',
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (term_source, source_lang, target_lang)
);

CREATE INDEX idx_glossary_langs ON glossary(source_lang, target_lang);
"#;

pub(crate) const CHUNK_MIGRATIONS: &[(i64, &str)] = &[(1, CHUNKS_V1)];

pub(crate) const GLOSSARY_MIGRATIONS: &[(i64, &str)] = &[(1, GLOSSARY_V1)];

/// Apply every migration in `migrations` that has not run yet.
pub fn run_migrations(conn: &Connection, migrations: &[(i64, &str)]) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in migrations {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        tracing::debug!(version, "Applied migration");
    }

    Ok(())
}
