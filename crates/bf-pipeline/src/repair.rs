//! Lenient parsing of engine JSON output.
//!
//! Engine responses are often almost-JSON: wrapped in a `response`
//! envelope, fenced in a markdown code block, cut off mid-object, or
//! carrying trailing commas. The helpers here recover what they can.

use std::sync::OnceLock;

use bf_core::{Error, Result};
use regex::Regex;
use serde_json::Value;

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\s*\n?```").unwrap())
}

/// If `raw` is a JSON object with a string `response` field, return that
/// field; otherwise return `raw` unchanged.
pub fn unwrap_envelope(raw: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        if let Some(Value::String(inner)) = map.get("response") {
            return inner.clone();
        }
    }
    raw.to_string()
}

/// Return the body of the first fenced code block, or the trimmed input if
/// there is none.
pub fn strip_code_fence(raw: &str) -> &str {
    match fence_pattern().captures(raw).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => raw.trim(),
    }
}

/// Envelope unwrap, fence strip, then strict parse.
pub fn parse_response(raw: &str) -> Result<Value> {
    let body = unwrap_envelope(raw);
    Ok(serde_json::from_str(strip_code_fence(&body))?)
}

/// Envelope unwrap, fence strip, then fault-tolerant parse.
pub fn parse_response_lenient(raw: &str) -> Result<Value> {
    let body = unwrap_envelope(raw);
    parse_lenient(strip_code_fence(&body))
}

/// Parse JSON, repairing trailing commas, unterminated strings and
/// unclosed objects or arrays if the strict parse fails. Text before the
/// first `{` or `[` and after the top-level value is ignored.
pub fn parse_lenient(raw: &str) -> Result<Value> {
    let start = raw
        .find(&['{', '['][..])
        .ok_or_else(|| Error::Parse("no JSON object or array in response".into()))?;
    let candidate = &raw[start..];

    if let Ok(value) = serde_json::from_str(candidate) {
        return Ok(value);
    }
    let repaired = repair(candidate);
    serde_json::from_str(&repaired).map_err(|e| Error::Parse(format!("unrepairable JSON: {e}")))
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    if out.ends_with(',') {
        out.pop();
    }
}

fn repair(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                stack.push('}');
                out.push(c);
            }
            '[' => {
                stack.push(']');
                out.push(c);
            }
            '}' | ']' => {
                drop_trailing_comma(&mut out);
                if stack.last() == Some(&c) {
                    stack.pop();
                }
                out.push(c);
                if stack.is_empty() {
                    return out;
                }
            }
            _ => out.push(c),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    drop_trailing_comma(&mut out);
    if out.ends_with(':') {
        out.push_str("null");
    }
    while let Some(closer) = stack.pop() {
        drop_trailing_comma(&mut out);
        out.push(closer);
    }
    out
}
