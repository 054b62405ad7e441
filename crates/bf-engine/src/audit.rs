//! Append-only prompt/response audit logs.
//!
//! Two JSON-lines files are written: `workers_input.log` with every prompt
//! sent and `workers_output.log` with every raw response or failure. Records
//! in both files share a per-call id. Write failures are logged and
//! swallowed; auditing never changes the outcome of a call.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use bf_core::Result;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

pub const INPUT_LOG: &str = "workers_input.log";
pub const OUTPUT_LOG: &str = "workers_output.log";

struct Sinks {
    input: Mutex<File>,
    output: Mutex<File>,
}

/// Audit sink shared by every call of a run.
pub struct AuditLog {
    sinks: Option<Sinks>,
}

#[derive(Serialize)]
struct InputRecord<'a> {
    ts: String,
    call_id: &'a Uuid,
    label: &'a str,
    attempt: u32,
    prompt: &'a str,
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    ts: String,
    call_id: &'a Uuid,
    label: &'a str,
    attempt: u32,
    ok: bool,
    body: &'a str,
}

impl AuditLog {
    /// Open (appending) the two log files in `dir`, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let open = |name: &str| OpenOptions::new().create(true).append(true).open(dir.join(name));
        Ok(Self {
            sinks: Some(Sinks {
                input: Mutex::new(open(INPUT_LOG)?),
                output: Mutex::new(open(OUTPUT_LOG)?),
            }),
        })
    }

    /// An audit log that records nothing.
    pub fn disabled() -> Self {
        Self { sinks: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sinks.is_some()
    }

    /// Record a prompt about to be sent.
    pub fn prompt(&self, call_id: &Uuid, label: &str, attempt: u32, prompt: &str) {
        let Some(sinks) = &self.sinks else { return };
        let record = InputRecord {
            ts: Utc::now().to_rfc3339(),
            call_id,
            label,
            attempt,
            prompt,
        };
        append(&sinks.input, &record);
    }

    /// Record the raw outcome of one attempt.
    pub fn response(&self, call_id: &Uuid, label: &str, attempt: u32, outcome: &Result<String>) {
        let Some(sinks) = &self.sinks else { return };
        let error_text;
        let (ok, body) = match outcome {
            Ok(text) => (true, text.as_str()),
            Err(e) => {
                error_text = e.to_string();
                (false, error_text.as_str())
            }
        };
        let record = OutputRecord {
            ts: Utc::now().to_rfc3339(),
            call_id,
            label,
            attempt,
            ok,
            body,
        };
        append(&sinks.output, &record);
    }
}

fn append<T: Serialize>(sink: &Mutex<File>, record: &T) {
    let line = match serde_json::to_string(record) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!("Failed to encode audit record: {e}");
            return;
        }
    };
    let mut file = sink.lock();
    if let Err(e) = writeln!(file, "{line}") {
        tracing::warn!("Failed to write audit record: {e}");
    }
}
