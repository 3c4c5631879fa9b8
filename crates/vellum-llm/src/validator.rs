//! Normalization of raw completion text into JSON.
//!
//! [`ResponseValidator::clean`] is the default path and fails loudly.
//! [`ResponseValidator::repair`] is a best-effort fallback that callers must
//! opt into; it is never applied automatically.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{LlmError, Result};

static UNQUOTED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("valid unquoted-key regex")
});

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]\}])").expect("valid trailing-comma regex"));

/// Stateless JSON cleaner for LLM output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    /// Trim, strip one surrounding Markdown code fence, and parse as JSON.
    pub fn clean(text: &str) -> Result<Value> {
        let stripped = strip_code_fence(text);
        serde_json::from_str(stripped).map_err(|e| {
            LlmError::Format(format!("response is not valid JSON: {}", e))
        })
    }

    /// Best-effort recovery for near-valid JSON.
    ///
    /// Quotes bare object keys, converts single quotes to double quotes, and
    /// drops trailing commas. Returns `None` when the result still does not
    /// parse.
    pub fn repair(text: &str) -> Option<Value> {
        let stripped = strip_code_fence(text);
        if let Ok(value) = serde_json::from_str(stripped) {
            return Some(value);
        }

        let quoted_keys = UNQUOTED_KEY.replace_all(stripped, "$1\"$2\":");
        let double_quoted = quoted_keys.replace('\'', "\"");
        let without_trailing = TRAILING_COMMA.replace_all(&double_quoted, "$1");

        match serde_json::from_str(&without_trailing) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, "JSON repair failed");
                None
            }
        }
    }
}

/// Remove a single leading ```` ``` ```` / ```` ```json ```` fence and its
/// closing fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag, if any, up to the first newline
    let body = match rest.find('\n') {
        Some(idx) if rest[..idx].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &rest[idx + 1..]
        }
        _ => rest.strip_prefix("json").unwrap_or(rest),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_strips_json_fence() {
        let value = ResponseValidator::clean("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_clean_strips_bare_fence() {
        let value = ResponseValidator::clean("  ```\n[1, 2]\n```  ").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_clean_single_line_fence() {
        let value = ResponseValidator::clean("```json{\"ok\":true}```").unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn test_clean_plain_json() {
        let value = ResponseValidator::clean("\n{\"tags\": [\"rust\"]}\n").unwrap();
        assert_eq!(value, json!({"tags": ["rust"]}));
    }

    #[test]
    fn test_clean_rejects_non_json() {
        let err = ResponseValidator::clean("not json").unwrap_err();
        assert!(matches!(err, LlmError::Format(_)));
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_clean_rejects_empty() {
        assert!(ResponseValidator::clean("").is_err());
        assert!(ResponseValidator::clean("```json\n```").is_err());
    }

    #[test]
    fn test_repair_unquoted_key_and_trailing_comma() {
        assert_eq!(ResponseValidator::repair("{a:1,}"), Some(json!({"a": 1})));
    }

    #[test]
    fn test_repair_single_quotes() {
        assert_eq!(
            ResponseValidator::repair("{'title': 'Note', 'tags': ['x', 'y',],}"),
            Some(json!({"title": "Note", "tags": ["x", "y"]}))
        );
    }

    #[test]
    fn test_repair_passes_valid_json_through() {
        assert_eq!(
            ResponseValidator::repair("```json\n{\"a\": \"b\"}\n```"),
            Some(json!({"a": "b"}))
        );
    }

    #[test]
    fn test_repair_gives_up() {
        assert_eq!(ResponseValidator::repair("{{{"), None);
    }
}
