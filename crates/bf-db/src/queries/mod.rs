//! Query modules, one per table.

pub mod chunks;
pub mod glossary;
