//! Human approval of discovered terms.

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use bf_core::{Error, Result};
use parking_lot::Mutex;

use crate::glossary;
use crate::terms::CandidateTerm;

/// Outcome of an approval round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    /// Terms to add to the glossary, possibly edited.
    Approved(Vec<CandidateTerm>),
    /// The operator aborted the run.
    Cancelled,
}

/// Decides which candidate terms reach the glossary.
///
/// Implementations may block (waiting on an operator); the pipeline calls
/// them from a blocking task.
pub trait TermApprover: Send + Sync {
    /// `buffer` is a scratch file the approver may use to present and
    /// collect edits.
    fn approve(&self, candidates: Vec<CandidateTerm>, buffer: &Path) -> Result<Approval>;
}

/// Accepts every candidate unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl TermApprover for AutoApprove {
    fn approve(&self, candidates: Vec<CandidateTerm>, _buffer: &Path) -> Result<Approval> {
        tracing::info!(count = candidates.len(), "Auto-approving discovered terms");
        Ok(Approval::Approved(candidates))
    }
}

/// Writes candidates to a TSV file for the operator to edit, waits for
/// confirmation on an input stream, then reads the edited file back.
pub struct TsvApprover {
    input: Mutex<Box<dyn BufRead + Send>>,
}

impl TsvApprover {
    /// Approver that waits on the process's standard input.
    pub fn stdin() -> Self {
        Self::with_input(std::io::BufReader::new(std::io::stdin()))
    }

    pub fn with_input(input: impl BufRead + Send + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
        }
    }
}

impl TermApprover for TsvApprover {
    fn approve(&self, candidates: Vec<CandidateTerm>, buffer: &Path) -> Result<Approval> {
        {
            let mut out = BufWriter::new(File::create(buffer)?);
            glossary::write_approval(&mut out, &candidates)?;
            out.flush()?;
        }

        eprintln!();
        eprintln!("{} new terms written to {}", candidates.len(), buffer.display());
        eprintln!("Review and edit the file, then press Enter to import it (or type 'q' to abort).");

        let mut answer = String::new();
        let read = self.input.lock().read_line(&mut answer)?;
        if read == 0 {
            return Err(Error::Validation(
                "no input available for term approval; rerun with --auto-approve".into(),
            ));
        }
        if answer.trim().eq_ignore_ascii_case("q") {
            tracing::warn!("Term approval aborted by operator");
            return Ok(Approval::Cancelled);
        }

        let approved: Vec<CandidateTerm> = glossary::parse(&std::fs::read_to_string(buffer)?)
            .into_iter()
            .map(|row| CandidateTerm {
                source: row.source,
                target: row.target,
                comment: row.comment,
            })
            .collect();
        tracing::info!(
            offered = candidates.len(),
            approved = approved.len(),
            "Imported approved terms"
        );
        Ok(Approval::Approved(approved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn candidates() -> Vec<CandidateTerm> {
        vec![
            CandidateTerm {
                source: "ベル".into(),
                target: "Белл".into(),
                comment: String::new(),
            },
            CandidateTerm {
                source: "ヘスティア".into(),
                target: "Гестия".into(),
                comment: "goddess".into(),
            },
        ]
    }

    #[test]
    fn auto_approve_accepts_all() {
        let dir = tempfile::tempdir().unwrap();
        let approval = AutoApprove.approve(candidates(), &dir.path().join("t.tsv")).unwrap();
        assert_eq!(approval, Approval::Approved(candidates()));
    }

    #[test]
    fn tsv_approver_reads_buffer_back() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = dir.path().join("pending_terms.tsv");
        let approver = TsvApprover::with_input(Cursor::new(b"\n".to_vec()));

        let approval = approver.approve(candidates(), &buffer).unwrap();
        assert_eq!(approval, Approval::Approved(candidates()));
        assert!(std::fs::read_to_string(&buffer).unwrap().contains("ヘスティア\tГестия\tgoddess"));
    }

    #[test]
    fn tsv_approver_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let approver = TsvApprover::with_input(Cursor::new(b"q\n".to_vec()));
        let approval = approver.approve(candidates(), &dir.path().join("t.tsv")).unwrap();
        assert_eq!(approval, Approval::Cancelled);
    }

    #[test]
    fn tsv_approver_without_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let approver = TsvApprover::with_input(Cursor::new(Vec::new()));
        assert!(approver.approve(candidates(), &dir.path().join("t.tsv")).is_err());
    }
}
