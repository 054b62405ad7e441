//! Whole-chapter proofreading pass.
//!
//! The engine sees every chunk at once and answers with find/replace
//! directives. The pass is best effort: any failure leaves the chapter as
//! it was.

use std::fmt::Write as _;
use std::time::Duration;

use bf_db::Chunk;
use bf_engine::{CallSpec, GenerationClient, OutputFormat, PromptContext, RetryPolicy};
use serde_json::Value;

use crate::diff::{apply_diffs, DiffReport};
use crate::repair;

pub struct GlobalProofreader {
    client: GenerationClient,
    template: String,
    timeout: Duration,
}

impl GlobalProofreader {
    pub fn new(client: GenerationClient, template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            template: template.into(),
            timeout,
        }
    }

    /// Template (with `context` substituted) followed by one block per
    /// chunk.
    pub fn build_prompt(&self, chunks: &[Chunk], context: &PromptContext) -> String {
        let mut prompt = context.substitute(&self.template);
        prompt.push_str("\n\n");
        for chunk in chunks {
            let _ = write!(
                prompt,
                "Chunk {}:\ncontent_source: {}\ncontent_target: {}\n\n",
                chunk.chunk_index,
                chunk.content_source,
                chunk.target_text()
            );
        }
        prompt
    }

    /// Ask for edits and apply them to a copy of `chunks`.
    ///
    /// Returns `None` when the call fails or the answer is not a JSON array.
    pub async fn proofread(&self, chunks: &[Chunk], context: &PromptContext) -> Option<DiffReport> {
        let prompt = self.build_prompt(chunks, context);
        let spec = CallSpec::new("global_reading", OutputFormat::Json, self.timeout)
            .with_retry(RetryPolicy::once());

        let raw = match self.client.generate(&prompt, &spec).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Global proofreading call failed, keeping chapter unchanged: {e}");
                return None;
            }
        };

        let edits = match repair::parse_response(&raw) {
            Ok(Value::Array(edits)) => edits,
            Ok(_) => {
                tracing::warn!("Global proofreading answer is not a JSON array, ignoring it");
                return None;
            }
            Err(e) => {
                tracing::warn!("Global proofreading answer unparseable, ignoring it: {e}");
                return None;
            }
        };

        let report = apply_diffs(chunks, &edits);
        tracing::info!(
            proposed = edits.len(),
            applied = report.applied,
            skipped = report.skipped,
            "Global proofreading edits"
        );
        Some(report)
    }
}
