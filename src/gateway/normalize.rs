//! Response normalization.
//!
//! Reads the answer text out of provider response envelopes and streamed
//! frames, and the human-readable message out of error envelopes.

use serde_json::Value;
use tracing::debug;

use super::error::{GatewayError, Result};
use super::provider::ProviderProfile;

/// Extracts the answer text from a complete response envelope.
pub fn extract(profile: &ProviderProfile, envelope: &Value) -> Result<String> {
    (profile.wire.extract)(envelope).ok_or_else(|| {
        debug!(
            provider = profile.id,
            wire = profile.wire.name,
            "Response envelope carried no answer text"
        );
        GatewayError::InvalidResponseFormat(format!(
            "{} response has no answer text",
            profile.display_name
        ))
    })
}

/// Extracts the text delta from one streamed frame.
///
/// Frames that carry no text (role announcements, usage blocks, pings) yield
/// `None`.
pub fn extract_delta(profile: &ProviderProfile, frame: &Value) -> Option<String> {
    (profile.wire.extract_delta)(frame).filter(|delta| !delta.is_empty())
}

/// Returns the failure reported by a streamed error event, if `frame` is one.
///
/// Anthropic sends `{"type": "error", "error": {...}}`; OpenAI-compatible
/// providers send `{"error": {...}}`.
pub fn stream_error(frame: &Value) -> Option<String> {
    let is_error = frame.get("error").is_some_and(Value::is_object)
        || frame.get("type").and_then(Value::as_str) == Some("error");
    is_error.then(|| {
        error_message(frame).unwrap_or_else(|| "provider reported a stream error".to_string())
    })
}

/// Returns the message carried by a provider error envelope.
///
/// Looks at `error.message`, then a top-level `message`, then `error` as a
/// plain string.
pub fn error_message(envelope: &Value) -> Option<String> {
    envelope
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| envelope.get("message").and_then(Value::as_str))
        .or_else(|| envelope.get("error").and_then(Value::as_str))
        .map(str::to_string)
}

/// `choices[0].message.content`.
pub fn chat_completions_text(envelope: &Value) -> Option<String> {
    envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `choices[0].delta.content`.
pub fn chat_completions_delta(frame: &Value) -> Option<String> {
    frame
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// First `text` block of `content`.
pub fn anthropic_text(envelope: &Value) -> Option<String> {
    envelope
        .get("content")?
        .as_array()?
        .iter()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `delta.text` of a `content_block_delta` event.
pub fn anthropic_delta(frame: &Value) -> Option<String> {
    frame
        .pointer("/delta/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `candidates[0].content.parts[0].text`.
pub fn gemini_text(envelope: &Value) -> Option<String> {
    envelope
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}
