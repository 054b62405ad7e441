//! Tab-separated glossary exchange format.
//!
//! ```text
//! # source_term	target_term	comment
//! 魔王	Повелитель демонов	main antagonist
//! ```
//!
//! Lines starting with `#` and blank lines are ignored. The comment column
//! is optional.

use std::io::Write;

use bf_core::Result;
use bf_db::GlossaryTerm;

use crate::terms::CandidateTerm;

pub const TSV_HEADER: &str = "# source_term\ttarget_term\tcomment";

/// One parsed TSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsvRow {
    pub source: String,
    pub target: String,
    pub comment: String,
}

impl From<CandidateTerm> for TsvRow {
    fn from(c: CandidateTerm) -> Self {
        Self {
            source: c.source,
            target: c.target,
            comment: c.comment,
        }
    }
}

fn clean(field: &str) -> String {
    field.replace(&['\t', '\n', '\r'][..], " ").trim().to_string()
}

fn write_row(out: &mut impl Write, source: &str, target: &str, comment: &str) -> Result<()> {
    writeln!(out, "{}\t{}\t{}", clean(source), clean(target), clean(comment))?;
    Ok(())
}

/// Write glossary terms as TSV.
pub fn write_terms(out: &mut impl Write, terms: &[GlossaryTerm]) -> Result<()> {
    writeln!(out, "{TSV_HEADER}")?;
    for term in terms {
        write_row(out, &term.term_source, &term.term_target, &term.comment)?;
    }
    Ok(())
}

/// Write the approval buffer: instructions, header and one row per
/// candidate.
pub fn write_approval(out: &mut impl Write, candidates: &[CandidateTerm]) -> Result<()> {
    writeln!(out, "# New terms found during discovery: {}", candidates.len())?;
    writeln!(out, "# Edit target terms or comments as needed. Delete a line to reject a term.")?;
    writeln!(out, "# Lines starting with '#' are ignored.")?;
    writeln!(out, "#")?;
    writeln!(out, "{TSV_HEADER}")?;
    for c in candidates {
        write_row(out, &c.source, &c.target, &c.comment)?;
    }
    Ok(())
}

/// Parse TSV text. Rows with fewer than two columns or an empty source or
/// target are skipped with a warning.
pub fn parse(text: &str) -> Vec<TsvRow> {
    let mut rows = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 2 {
            tracing::warn!(line = lineno + 1, "Skipping TSV row with fewer than two columns");
            continue;
        }
        let source = cols[0].trim();
        let target = cols[1].trim();
        if source.is_empty() || target.is_empty() {
            tracing::warn!(line = lineno + 1, "Skipping TSV row with empty term");
            continue;
        }
        rows.push(TsvRow {
            source: source.to_string(),
            target: target.to_string(),
            comment: cols.get(2).map(|c| c.trim().to_string()).unwrap_or_default(),
        });
    }
    rows
}
