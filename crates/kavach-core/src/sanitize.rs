//! # Input Sanitization
//!
//! Pure, recursive neutralization of markup in inbound JSON payloads.
//! Sanitization happens once at the middleware boundary; everything
//! downstream (handlers, audit detail, storage) sees the sanitized copy.
//!
//! Two levels of strictness:
//!
//! - [`sanitize`]: trims strings and HTML-entity-escapes the characters
//!   that give markup meaning, leaving alphanumerics and safe punctuation
//!   untouched. Recurses over arrays and objects, preserving key order.
//! - [`sanitize_storage_key`]: strips every character outside
//!   `[A-Za-z0-9 \-_]`. For values interpolated into storage-layer filter
//!   predicates. Defense in depth — the storage layer still uses
//!   parameterized queries.
//!
//! Recursion is bounded by [`MAX_DEPTH`]; a payload nested deeper is
//! rejected rather than walked.

use serde_json::Value;
use thiserror::Error;

/// Maximum nesting depth walked by [`sanitize`].
pub const MAX_DEPTH: usize = 32;

/// Errors from payload sanitization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    /// Payload nesting exceeds [`MAX_DEPTH`].
    #[error("payload nesting exceeds the maximum depth of {MAX_DEPTH}")]
    DepthExceeded,
}

/// Sanitize a JSON value for safe handling and storage.
///
/// Strings are trimmed and markup-escaped; arrays are mapped element-wise;
/// objects are recursed in key order. Numbers, booleans, and null pass
/// through unchanged. The input is not mutated — callers replace the
/// original payload with the returned copy.
pub fn sanitize(value: &Value) -> Result<Value, SanitizeError> {
    sanitize_at_depth(value, 0)
}

fn sanitize_at_depth(value: &Value, depth: usize) -> Result<Value, SanitizeError> {
    if depth > MAX_DEPTH {
        return Err(SanitizeError::DepthExceeded);
    }

    Ok(match value {
        Value::String(s) => Value::String(sanitize_str(s)),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(sanitize_at_depth(item, depth + 1)?);
            }
            Value::Array(out)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                out.insert(key.clone(), sanitize_at_depth(val, depth + 1)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

/// Trim a string and render any embedded markup inert.
///
/// Escapes the six characters that carry meaning in HTML/script contexts.
/// Alphanumerics and safe punctuation are untouched.
pub fn sanitize_str(input: &str) -> String {
    let trimmed = input.trim();
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}

/// Strict sanitizer for values that reach storage-layer predicates.
///
/// Keeps only ASCII alphanumerics, whitespace, hyphen, and underscore.
pub fn sanitize_storage_key(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_alphanumerics_untouched() {
        assert_eq!(sanitize_str("ABCDE1234F"), "ABCDE1234F");
        assert_eq!(sanitize_str("hello world-42_x"), "hello world-42_x");
    }

    #[test]
    fn script_tags_are_rendered_inert() {
        let out = sanitize_str("<script>alert('x')</script>");
        assert!(!out.contains('<'));
        assert!(!out.contains('>'));
        assert!(out.contains("&lt;script&gt;"));
        // Plain content survives.
        assert!(out.contains("alert"));
    }

    #[test]
    fn strings_are_trimmed() {
        assert_eq!(sanitize_str("  padded  "), "padded");
    }

    #[test]
    fn arrays_sanitized_element_wise() {
        let out = sanitize(&json!(["<b>a</b>", 7, true])).unwrap();
        assert_eq!(out, json!(["&lt;b&gt;a&lt;&#x2F;b&gt;", 7, true]));
    }

    #[test]
    fn objects_recurse_and_preserve_key_order() {
        let out = sanitize(&json!({
            "zeta": "<i>x</i>",
            "alpha": {"inner": "y<"},
            "num": 1
        }))
        .unwrap();
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "num"]);
        assert_eq!(out["alpha"]["inner"], "y&lt;");
    }

    #[test]
    fn primitives_pass_through() {
        assert_eq!(sanitize(&json!(null)).unwrap(), json!(null));
        assert_eq!(sanitize(&json!(3.5)).unwrap(), json!(3.5));
        assert_eq!(sanitize(&json!(false)).unwrap(), json!(false));
    }

    #[test]
    fn nesting_beyond_bound_is_rejected() {
        let mut v = json!("leaf");
        for _ in 0..(MAX_DEPTH + 1) {
            v = json!([v]);
        }
        assert_eq!(sanitize(&v), Err(SanitizeError::DepthExceeded));
    }

    #[test]
    fn nesting_at_bound_is_accepted() {
        let mut v = json!("leaf");
        for _ in 0..MAX_DEPTH {
            v = json!([v]);
        }
        assert!(sanitize(&v).is_ok());
    }

    #[test]
    fn storage_key_strips_predicate_metacharacters() {
        assert_eq!(sanitize_storage_key("user-1_x"), "user-1_x");
        assert_eq!(sanitize_storage_key("a'; DROP TABLE--"), "a DROP TABLE--");
        assert_eq!(sanitize_storage_key("$(rm)"), "rm");
    }

    proptest::proptest! {
        #[test]
        fn sanitized_strings_never_contain_markup(s in ".*") {
            let out = sanitize_str(&s);
            proptest::prop_assert!(!out.contains('<'));
            proptest::prop_assert!(!out.contains('>'));
        }

        #[test]
        fn storage_keys_only_contain_safe_chars(s in ".*") {
            let out = sanitize_storage_key(&s);
            let all_safe = out
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-' || c == '_');
            proptest::prop_assert!(all_safe);
        }
    }
}
