//! bf-core: shared types for the bookforge translation pipeline.
//!
//! Provides the unified error type, the chunk stage/status state machine,
//! series configuration, and the on-disk layout of a translation series.
//! Every other bf-* crate depends on this one.

pub mod config;
pub mod error;
pub mod paths;
pub mod stage;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use stage::{ChunkStatus, Phase, Stage};
