//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use bf_core::ChunkStatus;
use serde::{Deserialize, Serialize};

/// Parse a [`ChunkStatus`] from a text column.
fn parse_status(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<ChunkStatus> {
    let s: String = row.get(idx)?;
    s.parse().map_err(|e: bf_core::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One unit of chapter text tracked through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chapter_name: String,
    pub chunk_index: i64,
    pub content_source: String,
    pub content_target: Option<String>,
    pub status: ChunkStatus,
}

impl Chunk {
    /// A freshly split chunk awaiting term discovery.
    pub fn new(chapter_name: impl Into<String>, chunk_index: i64, content_source: impl Into<String>) -> Self {
        Self {
            chapter_name: chapter_name.into(),
            chunk_index,
            content_source: content_source.into(),
            content_target: None,
            status: ChunkStatus::INITIAL,
        }
    }

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            chapter_name: row.get(0)?,
            chunk_index: row.get(1)?,
            content_source: row.get(2)?,
            content_target: row.get(3)?,
            status: parse_status(row, 4)?,
        })
    }

    /// Target text, or an empty string before translation.
    pub fn target_text(&self) -> &str {
        self.content_target.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// GlossaryTerm
// ---------------------------------------------------------------------------

/// Approved source → target vocabulary entry for one language pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term_source: String,
    pub term_target: String,
    pub source_lang: String,
    pub target_lang: String,
    pub comment: String,
}

impl GlossaryTerm {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            term_source: row.get(0)?,
            term_target: row.get(1)?,
            source_lang: row.get(2)?,
            target_lang: row.get(3)?,
            comment: row.get(4)?,
        })
    }
}
