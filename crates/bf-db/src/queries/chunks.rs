//! Chunk table operations.
//!
//! Rows are keyed by `(chapter_name, chunk_index)`. Writes are upserts on
//! that key, and an existing row's `content_source` is never rewritten.

use bf_core::{ChunkStatus, Error, Phase, Result, Stage};
use chrono::Utc;
use rusqlite::Connection;

use crate::models::Chunk;

const COLS: &str = "chapter_name, chunk_index, content_source, content_target, status";

/// Insert a chunk, or update the target text and status of an existing one.
pub fn upsert_chunk(conn: &Connection, chunk: &Chunk) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO chunks (chapter_name, chunk_index, content_source, content_target, status, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(chapter_name, chunk_index) DO UPDATE SET
            content_target = excluded.content_target,
            status = excluded.status,
            updated_at = excluded.updated_at",
        rusqlite::params![
            chunk.chapter_name,
            chunk.chunk_index,
            chunk.content_source,
            chunk.content_target,
            chunk.status.to_string(),
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Upsert a batch of chunks in one transaction.
pub fn upsert_chunks(conn: &Connection, chunks: &[Chunk]) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    for chunk in chunks {
        upsert_chunk(&tx, chunk)?;
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))
}

/// Get one chunk by key.
pub fn get_chunk(conn: &Connection, chapter: &str, index: i64) -> Result<Option<Chunk>> {
    let q = format!("SELECT {COLS} FROM chunks WHERE chapter_name = ?1 AND chunk_index = ?2");
    let result = conn.query_row(&q, rusqlite::params![chapter, index], Chunk::from_row);
    match result {
        Ok(c) => Ok(Some(c)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// All chunks of a chapter, ordered by index.
pub fn list_chunks(conn: &Connection, chapter: &str) -> Result<Vec<Chunk>> {
    let q = format!("SELECT {COLS} FROM chunks WHERE chapter_name = ?1 ORDER BY chunk_index");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([chapter], Chunk::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Chunks of a chapter with the given status, ordered by index.
pub fn list_chunks_by_status(
    conn: &Connection,
    chapter: &str,
    status: ChunkStatus,
) -> Result<Vec<Chunk>> {
    let q = format!(
        "SELECT {COLS} FROM chunks WHERE chapter_name = ?1 AND status = ?2 ORDER BY chunk_index"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![chapter, status.to_string()], Chunk::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Number of chunks stored for a chapter.
pub fn count_chunks(conn: &Connection, chapter: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM chunks WHERE chapter_name = ?1",
        [chapter],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Per-status chunk counts for a chapter, sorted by status string.
pub fn status_counts(conn: &Connection, chapter: &str) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT status, COUNT(*) FROM chunks WHERE chapter_name = ?1
             GROUP BY status ORDER BY status",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([chapter], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Distinct chapter names present in the store.
pub fn list_chapters(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT chapter_name FROM chunks ORDER BY chapter_name")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Set a chunk's status without touching its content.
pub fn update_status(conn: &Connection, chapter: &str, index: i64, status: ChunkStatus) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE chunks SET status = ?1, updated_at = ?2
             WHERE chapter_name = ?3 AND chunk_index = ?4",
            rusqlite::params![status.to_string(), Utc::now().to_rfc3339(), chapter, index],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Move every in-progress or failed chunk of a chapter back to pending in
/// its current stage. Returns the number of chunks requeued.
pub fn requeue_interrupted(conn: &Connection, chapter: &str) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let now = Utc::now().to_rfc3339();

    let mut total = 0;
    for stage in Stage::ALL {
        for phase in [Phase::InProgress, Phase::Failed] {
            let from = ChunkStatus::new(stage, phase);
            total += tx
                .execute(
                    "UPDATE chunks SET status = ?1, updated_at = ?2
                     WHERE chapter_name = ?3 AND status = ?4",
                    rusqlite::params![from.requeued().to_string(), now, chapter, from.to_string()],
                )
                .map_err(|e| Error::database(e.to_string()))?;
        }
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(total)
}

/// Move every `stage_done` chunk of a chapter to the next stage's pending
/// status. Returns the number of chunks moved; zero for the last stage.
pub fn advance_stage(conn: &Connection, chapter: &str, stage: Stage) -> Result<usize> {
    let done = ChunkStatus::done(stage);
    let Some(next) = done.advanced() else {
        return Ok(0);
    };
    conn.execute(
        "UPDATE chunks SET status = ?1, updated_at = ?2
         WHERE chapter_name = ?3 AND status = ?4",
        rusqlite::params![next.to_string(), Utc::now().to_rfc3339(), chapter, done.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Delete every chunk of a chapter. Returns the number of rows removed.
pub fn delete_chapter(conn: &Connection, chapter: &str) -> Result<usize> {
    conn.execute("DELETE FROM chunks WHERE chapter_name = ?1", [chapter])
        .map_err(|e| Error::database(e.to_string()))
}
