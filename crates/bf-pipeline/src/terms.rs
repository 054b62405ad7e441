//! Collecting candidate glossary terms from discovery responses.

use std::collections::HashSet;
use std::fmt;

use bf_core::{Error, Result};
use serde_json::Value;

use crate::repair;

/// Term categories a discovery response may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Characters,
    Terminology,
    Expressions,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Characters, Category::Terminology, Category::Expressions];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Characters => "characters",
            Self::Terminology => "terminology",
            Self::Expressions => "expressions",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One discovered term as the engine described it.
#[derive(Debug, Clone, PartialEq)]
pub struct TermRecord {
    pub category: Category,
    pub id: String,
    pub record: Value,
}

/// A term proposed for the glossary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTerm {
    pub source: String,
    pub target: String,
    pub comment: String,
}

fn first_str<'a>(record: &'a Value, paths: &[&[&str]]) -> Option<&'a str> {
    paths.iter().find_map(|path| {
        let mut cur = record;
        for key in *path {
            cur = cur.get(key)?;
        }
        cur.as_str().map(str::trim).filter(|s| !s.is_empty())
    })
}

impl TermRecord {
    /// Map the record to a glossary candidate. Records without a target
    /// rendering yield `None`.
    pub fn to_candidate(&self) -> Option<CandidateTerm> {
        let source = first_str(
            &self.record,
            &[&["name", "jp"], &["term_jp"], &["term_source"], &["name", "source"]],
        )
        .unwrap_or(self.id.as_str());
        let target = first_str(
            &self.record,
            &[&["name", "ru"], &["term_ru"], &["term_target"], &["name", "target"]],
        )?;

        let mut comment = first_str(&self.record, &[&["description"], &["comment"]])
            .unwrap_or_default()
            .to_string();
        if let Some(context) = first_str(&self.record, &[&["context"]]) {
            if !comment.is_empty() {
                comment.push_str(" | ");
            }
            comment.push_str(context);
        }

        Some(CandidateTerm {
            source: source.to_string(),
            target: target.to_string(),
            comment: comment.replace(&['\t', '\n'][..], " "),
        })
    }
}

/// Deduplicates terms across discovery responses. The first occurrence of
/// a term id wins, whatever its category.
#[derive(Debug, Default)]
pub struct TermCollector {
    seen: HashSet<String>,
    terms: Vec<TermRecord>,
    rejected: usize,
}

impl TermCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect from many responses, logging and skipping unparseable ones.
    pub fn collect<'a>(responses: impl IntoIterator<Item = (i64, &'a str)>) -> Self {
        let mut collector = Self::new();
        for (chunk_index, raw) in responses {
            if let Err(e) = collector.add_response(raw) {
                tracing::warn!(chunk = chunk_index, "Skipping discovery response: {e}");
                collector.rejected += 1;
            }
        }
        collector
    }

    /// Add one raw response. Returns how many new term ids it contributed.
    pub fn add_response(&mut self, raw: &str) -> Result<usize> {
        let value = repair::parse_response_lenient(raw)?;
        let Value::Object(root) = value else {
            return Err(Error::Parse("discovery response is not a JSON object".into()));
        };

        let mut added = 0;
        for category in Category::ALL {
            let Some(Value::Object(entries)) = root.get(category.key()) else {
                continue;
            };
            for (id, record) in entries {
                if self.seen.insert(id.clone()) {
                    self.terms.push(TermRecord {
                        category,
                        id: id.clone(),
                        record: record.clone(),
                    });
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    pub fn terms(&self) -> &[TermRecord] {
        &self.terms
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &TermRecord> {
        self.terms.iter().filter(move |t| t.category == category)
    }

    /// Number of responses that could not be parsed.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Glossary candidates, in discovery order.
    pub fn candidates(&self) -> Vec<CandidateTerm> {
        self.terms.iter().filter_map(TermRecord::to_candidate).collect()
    }
}
