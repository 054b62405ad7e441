//! bf-db: persistence layer for chunks and glossary terms.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, typed models, free-function query modules, and
//! the [`ChunkStore`]/[`GlossaryStore`] handles the pipeline works with.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

pub use models::{Chunk, GlossaryTerm};
pub use pool::{DbPool, Schema};
pub use store::{ChunkStore, GlossaryStore};
