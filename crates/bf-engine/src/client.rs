//! One throttled, audited, retried engine call.

use std::sync::Arc;
use std::time::Duration;

use bf_core::Result;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::engine::{GenerationEngine, OutputFormat};
use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;

/// Parameters of a single logical call.
#[derive(Debug, Clone)]
pub struct CallSpec {
    /// Free-form label recorded in the audit log, e.g. `translation#3`.
    pub label: String,
    pub format: OutputFormat,
    pub timeout: Duration,
    /// Overrides the client's default policy when set.
    pub retry: Option<RetryPolicy>,
}

impl CallSpec {
    pub fn new(label: impl Into<String>, format: OutputFormat, timeout: Duration) -> Self {
        Self {
            label: label.into(),
            format,
            timeout,
            retry: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Shared entry point for every engine call of a run.
///
/// Each attempt waits on the rate limiter before it starts, so retries are
/// throttled like first attempts.
#[derive(Clone)]
pub struct GenerationClient {
    engine: Arc<dyn GenerationEngine>,
    limiter: Arc<RateLimiter>,
    audit: Arc<AuditLog>,
    retry: RetryPolicy,
}

impl GenerationClient {
    pub fn new(
        engine: Arc<dyn GenerationEngine>,
        limiter: Arc<RateLimiter>,
        audit: Arc<AuditLog>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            limiter,
            audit,
            retry,
        }
    }

    /// Send `prompt` to the engine and return its raw output.
    pub async fn generate(&self, prompt: &str, spec: &CallSpec) -> Result<String> {
        let call_id = Uuid::new_v4();
        let policy = spec.retry.unwrap_or(self.retry);

        tracing::debug!(%call_id, label = %spec.label, chars = prompt.chars().count(), "Engine call");

        policy
            .run(|attempt| async move {
                self.audit.prompt(&call_id, &spec.label, attempt, prompt);
                self.limiter.acquire().await;
                let outcome = self.engine.generate(prompt, spec.format, spec.timeout).await;
                self.audit.response(&call_id, &spec.label, attempt, &outcome);
                outcome
            })
            .await
    }
}
