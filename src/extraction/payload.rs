//! Locating and parsing the structured payload inside a model answer.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::gateway::{GatewayError, Result};

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Returns the substring expected to hold the payload.
///
/// A fenced code block wins. Otherwise balanced array and object literals
/// are tried in order and the first one shaped like a payload is used, so
/// bracketed prose such as `[1]` ahead of the data is passed over.
pub fn locate(answer: &str) -> Option<&str> {
    if let Some(block) = FENCED_BLOCK
        .captures(answer)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|block| !block.is_empty())
    {
        return Some(block);
    }
    balanced_literals(answer).find(|span| {
        serde_json::from_str::<Value>(span)
            .ok()
            .and_then(payload_items)
            .is_some()
    })
}

/// Yields the balanced `[...]` or `{...}` span starting at each opening
/// bracket, in order of position.
fn balanced_literals(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|&(_, ch)| matches!(ch, '[' | '{'))
        .filter_map(move |(start, _)| balanced_from(text, start))
}

/// Returns the balanced span opening at `start`, skipping brackets inside
/// string literals.
fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Transaction elements of a payload-shaped value: an array of objects, or
/// an object with a `transactions` array.
fn payload_items(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) => Some(items),
        Value::Object(mut map) => match map.remove("transactions") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// Parses the payload into its transaction elements.
///
/// Accepts an array of objects or an object with a `transactions` array.
pub fn parse_elements(answer: &str) -> Result<Vec<Value>> {
    let located = locate(answer).ok_or_else(|| {
        GatewayError::ExtractionParseError("no structured payload in answer".to_string())
    })?;

    let value: Value = serde_json::from_str(located).map_err(|e| {
        GatewayError::ExtractionParseError(format!("payload is not valid JSON: {e}"))
    })?;

    payload_items(value).ok_or_else(|| {
        GatewayError::ExtractionParseError(
            "payload is neither an array of objects nor an object with a transactions array"
                .to_string(),
        )
    })
}
