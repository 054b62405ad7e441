//! Sparse find/replace edits produced by whole-chapter proofreading.

use bf_db::Chunk;
use serde_json::Value;

/// One edit against a chunk's target text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffDirective {
    pub chunk_index: i64,
    pub find: String,
    pub replace: String,
}

impl DiffDirective {
    /// Read a directive from a JSON object. Returns `None` when a field is
    /// missing or has the wrong type, or `find` is empty.
    pub fn from_value(value: &Value) -> Option<Self> {
        let chunk_index = value.get("chunk_index")?.as_i64()?;
        let find = value.get("find")?.as_str()?;
        let replace = value.get("replace")?.as_str()?;
        if find.is_empty() {
            return None;
        }
        Some(Self {
            chunk_index,
            find: find.to_string(),
            replace: replace.to_string(),
        })
    }
}

/// Result of applying a batch of directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub chunks: Vec<Chunk>,
    pub applied: usize,
    pub skipped: usize,
}

/// Apply `directives` in order to a copy of `chunks`.
///
/// A directive is applied only when its `find` text occurs exactly once in
/// the addressed chunk's current target text. Malformed directives and
/// directives addressing an unknown chunk index count as skipped.
pub fn apply_diffs(chunks: &[Chunk], directives: &[Value]) -> DiffReport {
    let mut out = chunks.to_vec();
    let mut applied = 0;
    let mut skipped = 0;

    for raw in directives {
        let Some(directive) = DiffDirective::from_value(raw) else {
            tracing::debug!(directive = %raw, "Ignoring malformed edit");
            skipped += 1;
            continue;
        };
        let Some(chunk) = out.iter_mut().find(|c| c.chunk_index == directive.chunk_index) else {
            tracing::debug!(chunk = directive.chunk_index, "Ignoring edit for unknown chunk");
            skipped += 1;
            continue;
        };

        let target = chunk.target_text();
        match target.matches(directive.find.as_str()).count() {
            1 => {
                let edited = target.replacen(directive.find.as_str(), &directive.replace, 1);
                chunk.content_target = Some(edited);
                applied += 1;
            }
            0 => {
                tracing::warn!(chunk = directive.chunk_index, find = %directive.find, "Edit target not found");
                skipped += 1;
            }
            n => {
                tracing::warn!(
                    chunk = directive.chunk_index,
                    find = %directive.find,
                    occurrences = n,
                    "Edit target is ambiguous"
                );
                skipped += 1;
            }
        }
    }

    DiffReport {
        chunks: out,
        applied,
        skipped,
    }
}
