//! Store handles used by the pipeline.
//!
//! A [`ChunkStore`] is scoped to one chapter and a [`GlossaryStore`] to one
//! language pair, so callers never repeat the scoping key.

use std::path::Path;

use bf_core::{ChunkStatus, Result, Stage};

use crate::models::{Chunk, GlossaryTerm};
use crate::pool::{get_conn, init_memory_pool, init_pool, DbPool, Schema};
use crate::queries::{chunks, glossary};

// ---------------------------------------------------------------------------
// ChunkStore
// ---------------------------------------------------------------------------

/// Durable record of every chunk of one chapter.
#[derive(Clone)]
pub struct ChunkStore {
    pool: DbPool,
    chapter: String,
}

impl ChunkStore {
    pub fn new(pool: DbPool, chapter: impl Into<String>) -> Self {
        Self {
            pool,
            chapter: chapter.into(),
        }
    }

    /// Open (creating if needed) the chunk database at `db_path`.
    pub fn open(db_path: &Path, chapter: impl Into<String>) -> Result<Self> {
        Ok(Self::new(init_pool(db_path, Schema::Chunks)?, chapter))
    }

    pub fn in_memory(chapter: impl Into<String>) -> Result<Self> {
        Ok(Self::new(init_memory_pool(Schema::Chunks)?, chapter))
    }

    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    pub fn upsert(&self, chunk: &Chunk) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        chunks::upsert_chunk(&conn, chunk)
    }

    pub fn upsert_all(&self, batch: &[Chunk]) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        chunks::upsert_chunks(&conn, batch)
    }

    pub fn get(&self, index: i64) -> Result<Option<Chunk>> {
        let conn = get_conn(&self.pool)?;
        chunks::get_chunk(&conn, &self.chapter, index)
    }

    /// All chunks, ordered by index.
    pub fn all(&self) -> Result<Vec<Chunk>> {
        let conn = get_conn(&self.pool)?;
        chunks::list_chunks(&conn, &self.chapter)
    }

    pub fn with_status(&self, status: ChunkStatus) -> Result<Vec<Chunk>> {
        let conn = get_conn(&self.pool)?;
        chunks::list_chunks_by_status(&conn, &self.chapter, status)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = get_conn(&self.pool)?;
        chunks::count_chunks(&conn, &self.chapter)
    }

    pub fn status_counts(&self) -> Result<Vec<(String, i64)>> {
        let conn = get_conn(&self.pool)?;
        chunks::status_counts(&conn, &self.chapter)
    }

    pub fn set_status(&self, index: i64, status: ChunkStatus) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        chunks::update_status(&conn, &self.chapter, index, status)
    }

    pub fn requeue_interrupted(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        chunks::requeue_interrupted(&conn, &self.chapter)
    }

    pub fn advance(&self, stage: Stage) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        chunks::advance_stage(&conn, &self.chapter, stage)
    }

    /// Remove every chunk of this chapter.
    pub fn reset(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        chunks::delete_chapter(&conn, &self.chapter)
    }
}

// ---------------------------------------------------------------------------
// GlossaryStore
// ---------------------------------------------------------------------------

/// Series glossary for one language pair.
#[derive(Clone)]
pub struct GlossaryStore {
    pool: DbPool,
    source_lang: String,
    target_lang: String,
}

impl GlossaryStore {
    pub fn new(pool: DbPool, source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            pool,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    pub fn open(
        db_path: &Path,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(init_pool(db_path, Schema::Glossary)?, source_lang, target_lang))
    }

    pub fn in_memory(source_lang: impl Into<String>, target_lang: impl Into<String>) -> Result<Self> {
        Ok(Self::new(init_memory_pool(Schema::Glossary)?, source_lang, target_lang))
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// Build a term in this store's language pair.
    pub fn term(&self, source: &str, target: &str, comment: &str) -> GlossaryTerm {
        GlossaryTerm {
            term_source: source.to_string(),
            term_target: target.to_string(),
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            comment: comment.to_string(),
        }
    }

    pub fn upsert(&self, source: &str, target: &str, comment: &str) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        glossary::upsert_term(&conn, &self.term(source, target, comment))
    }

    pub fn upsert_all(&self, terms: &[GlossaryTerm]) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        glossary::upsert_terms(&conn, terms)
    }

    pub fn get(&self, source: &str) -> Result<Option<GlossaryTerm>> {
        let conn = get_conn(&self.pool)?;
        glossary::get_term(&conn, source, &self.source_lang, &self.target_lang)
    }

    pub fn list(&self) -> Result<Vec<GlossaryTerm>> {
        let conn = get_conn(&self.pool)?;
        glossary::list_terms(&conn, &self.source_lang, &self.target_lang)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = get_conn(&self.pool)?;
        glossary::count_terms(&conn, &self.source_lang, &self.target_lang)
    }

    pub fn delete(&self, source: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        glossary::delete_term(&conn, source, &self.source_lang, &self.target_lang)
    }
}
