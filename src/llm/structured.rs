//! Recovery of structured output from free-form inference text.
//!
//! The inference service gives no structured-output guarantee, so every
//! call site funnels its response through [`parse_structured`]: locate the
//! first well-formed JSON object or array substring and deserialize it.
//! Absence of a parseable substring is a typed "no structured answer", not
//! a hard error, which keeps the fallback path identical everywhere.

use serde::de::DeserializeOwned;

/// Why structured output could not be recovered from inference text.
#[derive(Debug, thiserror::Error)]
pub enum StructuredParseError {
    #[error("no JSON object or array found in inference output")]
    NoJson,

    #[error("inference output JSON did not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Extract and deserialize the first well-formed JSON object/array embedded
/// in `text`.
///
/// If the first well-formed substring is valid JSON but does not match `T`,
/// that is a [`StructuredParseError::Shape`] — the service answered with
/// structure, just not the structure asked for.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, StructuredParseError> {
    for (start, c) in text.char_indices() {
        if c != '{' && c != '[' {
            continue;
        }
        let Some(len) = balanced_len(&text[start..]) else {
            continue;
        };
        let candidate = &text[start..start + len];
        if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
            return serde_json::from_str::<T>(candidate).map_err(StructuredParseError::Shape);
        }
    }
    Err(StructuredParseError::NoJson)
}

/// Byte length of the balanced bracket run starting at the first byte of
/// `text`, honoring JSON string literals and escapes. `None` if the run
/// never closes.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
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
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}
