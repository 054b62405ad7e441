//! Placeholder substitution for prompt templates.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Named values substituted into a prompt template.
///
/// Placeholders use the `{name}` syntax. Substitution is a single pass over
/// the template: text inserted for one placeholder is never scanned for
/// further placeholders, and unknown placeholders are left as they are.
///
/// # Example
///
/// ```
/// use bf_engine::PromptContext;
///
/// let ctx = PromptContext::new()
///     .with_var("text", "勇者が来た。")
///     .with_var("glossary", "[]");
///
/// assert_eq!(
///     ctx.substitute("Glossary: {glossary}\n\n{text}"),
///     "Glossary: []\n\n勇者が来た。"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    vars: HashMap<String, String>,
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

impl PromptContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with_var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Set a variable in place.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(key.to_string(), value.into());
    }

    /// Get a variable value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Substitute all known `{name}` placeholders in `template`.
    pub fn substitute(&self, template: &str) -> String {
        placeholder_pattern()
            .replace_all(template, |caps: &Captures| match self.vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_occurrences() {
        let ctx = PromptContext::new().with_var("text", "abc");
        assert_eq!(ctx.substitute("{text} / {text}"), "abc / abc");
    }

    #[test]
    fn unknown_placeholders_untouched() {
        let ctx = PromptContext::new().with_var("text", "x");
        assert_eq!(
            ctx.substitute(r#"{text} {world_info} {"json": 1}"#),
            r#"x {world_info} {"json": 1}"#
        );
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let ctx = PromptContext::new()
            .with_var("text", "literal {glossary} in source")
            .with_var("glossary", "TERMS");
        assert_eq!(
            ctx.substitute("{glossary}|{text}"),
            "TERMS|literal {glossary} in source"
        );
    }

    #[test]
    fn set_and_get() {
        let mut ctx = PromptContext::new();
        ctx.set("previous_context", "");
        assert_eq!(ctx.get("previous_context"), Some(""));
        assert_eq!(ctx.substitute("[{previous_context}]"), "[]");
        assert!(ctx.get("missing").is_none());
    }
}
