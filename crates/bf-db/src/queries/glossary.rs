//! Glossary table operations.

use bf_core::{Error, Result};
use chrono::Utc;
use rusqlite::Connection;

use crate::models::GlossaryTerm;

const COLS: &str = "term_source, term_target, source_lang, target_lang, comment";

/// Insert a term or overwrite the target and comment of an existing one.
pub fn upsert_term(conn: &Connection, term: &GlossaryTerm) -> Result<()> {
    conn.execute(
        "INSERT INTO glossary (term_source, term_target, source_lang, target_lang, comment, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(term_source, source_lang, target_lang) DO UPDATE SET
            term_target = excluded.term_target,
            comment = excluded.comment,
            updated_at = excluded.updated_at",
        rusqlite::params![
            term.term_source,
            term.term_target,
            term.source_lang,
            term.target_lang,
            term.comment,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Upsert a batch of terms in one transaction.
pub fn upsert_terms(conn: &Connection, terms: &[GlossaryTerm]) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    for term in terms {
        upsert_term(&tx, term)?;
    }
    tx.commit().map_err(|e| Error::database(e.to_string()))
}

/// Get one term by key.
pub fn get_term(
    conn: &Connection,
    term_source: &str,
    source_lang: &str,
    target_lang: &str,
) -> Result<Option<GlossaryTerm>> {
    let q = format!(
        "SELECT {COLS} FROM glossary
         WHERE term_source = ?1 AND source_lang = ?2 AND target_lang = ?3"
    );
    let result = conn.query_row(
        &q,
        rusqlite::params![term_source, source_lang, target_lang],
        GlossaryTerm::from_row,
    );
    match result {
        Ok(t) => Ok(Some(t)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// All terms for a language pair, ordered by source term.
pub fn list_terms(conn: &Connection, source_lang: &str, target_lang: &str) -> Result<Vec<GlossaryTerm>> {
    let q = format!(
        "SELECT {COLS} FROM glossary WHERE source_lang = ?1 AND target_lang = ?2
         ORDER BY term_source"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![source_lang, target_lang], GlossaryTerm::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Number of terms for a language pair.
pub fn count_terms(conn: &Connection, source_lang: &str, target_lang: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM glossary WHERE source_lang = ?1 AND target_lang = ?2",
        rusqlite::params![source_lang, target_lang],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Remove a term. Returns whether a row was deleted.
pub fn delete_term(
    conn: &Connection,
    term_source: &str,
    source_lang: &str,
    target_lang: &str,
) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM glossary WHERE term_source = ?1 AND source_lang = ?2 AND target_lang = ?3",
            rusqlite::params![term_source, source_lang, target_lang],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
