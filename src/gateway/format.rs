//! Request formatting.
//!
//! Turns a provider-agnostic [`Conversation`] into the URL, headers and JSON
//! body a specific provider expects.

use std::fmt;

use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::error::{GatewayError, Result};
use super::message::{Conversation, ImageData, Message, Role};
use super::provider::{AuthScheme, ProviderProfile};
use crate::config::GatewayConfig;

/// Upper bound on generated tokens for every request.
pub const MAX_TOKENS: u32 = 1024;

/// Inputs to a [`WireFormat`](super::provider::WireFormat) body builder.
#[derive(Debug, Clone, Copy)]
pub struct BodyParams<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Messages in wire order, already adjusted for system-role support.
    pub messages: &'a [Message],
    /// Generation limit.
    pub max_tokens: u32,
    /// Whether to request a streamed response.
    pub stream: bool,
    /// Whether image parts carry bare base64 instead of a `data:` URI.
    pub raw_image_base64: bool,
}

/// A fully formatted outbound request.
#[derive(Clone, PartialEq)]
pub struct FormattedRequest {
    /// Endpoint URL, including any credential query parameter.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON request body.
    pub body: Value,
    /// Whether the body asks for a streamed response.
    pub streaming: bool,
}

impl FormattedRequest {
    /// Serialises the body to its exact wire text.
    pub fn body_text(&self) -> String {
        self.body.to_string()
    }

    /// Returns the value of a header (case-insensitive name match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for FormattedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoint = self.url.split('?').next().unwrap_or_default();
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("FormattedRequest")
            .field("endpoint", &endpoint)
            .field("headers", &header_names)
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}

/// Builds the provider request for a conversation.
///
/// For wire formats without a native system role, only the system prompt and
/// the latest user turn are sent, merged into a single user message. The
/// streaming flag is set only when the provider supports it.
pub fn format(
    profile: &ProviderProfile,
    config: &GatewayConfig,
    conversation: &Conversation,
    system_prompt: &str,
    want_streaming: bool,
) -> Result<FormattedRequest> {
    validate(profile, config)?;

    let messages = wire_messages(profile, conversation, system_prompt)?;
    let streaming = profile.supports_streaming && want_streaming;
    let body = (profile.wire.build_body)(&BodyParams {
        model: &config.model,
        messages: &messages,
        max_tokens: MAX_TOKENS,
        stream: streaming,
        raw_image_base64: profile.raw_image_base64,
    });

    let request = FormattedRequest {
        url: build_url(profile, config)?,
        headers: build_headers(profile, config),
        body,
        streaming,
    };

    debug!(
        provider = profile.id,
        model = %config.model,
        wire = profile.wire.name,
        message_count = messages.len(),
        want_streaming,
        streaming,
        "Formatted provider request"
    );

    Ok(request)
}

/// Builds a single-turn image recognition request.
///
/// The image and instruction travel in one user turn with no system prompt
/// and streaming disabled.
pub fn format_vision(
    profile: &ProviderProfile,
    config: &GatewayConfig,
    image: &ImageData,
    prompt: &str,
) -> Result<FormattedRequest> {
    validate(profile, config)?;
    if !profile.supports_vision {
        return Err(GatewayError::InvalidConfig(format!(
            "{} does not support image recognition",
            profile.display_name
        )));
    }

    let messages = [Message::user(prompt).with_image(image.clone())];
    let body = (profile.wire.build_body)(&BodyParams {
        model: &config.model,
        messages: &messages,
        max_tokens: MAX_TOKENS,
        stream: false,
        raw_image_base64: profile.raw_image_base64,
    });

    debug!(
        provider = profile.id,
        model = %config.model,
        media_type = %image.media_type,
        image_len = image.base64.len(),
        "Formatted vision request"
    );

    Ok(FormattedRequest {
        url: build_url(profile, config)?,
        headers: build_headers(profile, config),
        body,
        streaming: false,
    })
}

fn validate(profile: &ProviderProfile, config: &GatewayConfig) -> Result<()> {
    if config.api_key.trim().is_empty() {
        return Err(GatewayError::InvalidConfig(format!(
            "API key is not set for {}",
            profile.display_name
        )));
    }
    if !profile.is_selectable(&config.model) {
        return Err(GatewayError::InvalidConfig(format!(
            "model '{}' is not available for {}",
            config.model, profile.display_name
        )));
    }
    if profile.requires_base_url() && config.base_url().is_none() {
        return Err(GatewayError::InvalidConfig(format!(
            "{} requires a base URL",
            profile.display_name
        )));
    }
    Ok(())
}

fn wire_messages(
    profile: &ProviderProfile,
    conversation: &Conversation,
    system_prompt: &str,
) -> Result<Vec<Message>> {
    if profile.wire.native_system_role {
        if conversation.is_empty() {
            return Err(GatewayError::InvalidInput(
                "conversation has no messages".to_string(),
            ));
        }
        let mut messages = Vec::with_capacity(conversation.messages().len() + 1);
        if !system_prompt.is_empty() {
            messages.push(Message::system(system_prompt));
        }
        messages.extend(conversation.messages().iter().cloned());
        return Ok(messages);
    }

    let latest = conversation.latest_user().ok_or_else(|| {
        GatewayError::InvalidInput("conversation has no user message".to_string())
    })?;
    let content = if system_prompt.is_empty() {
        latest.content.clone()
    } else {
        format!("{system_prompt}\n\n{}", latest.content)
    };
    Ok(vec![Message {
        role: Role::User,
        content,
        images: latest.images.clone(),
    }])
}

fn build_url(profile: &ProviderProfile, config: &GatewayConfig) -> Result<String> {
    let base = config
        .base_url()
        .unwrap_or(profile.base_url)
        .trim_end_matches('/');
    let path = profile.path_template.replace("{model}", &config.model);

    let mut url = Url::parse(&format!("{base}{path}")).map_err(|e| {
        GatewayError::InvalidConfig(format!("invalid base URL '{base}': {e}"))
    })?;

    if let AuthScheme::QueryParam(param) = profile.auth_scheme {
        url.query_pairs_mut().append_pair(param, &config.api_key);
    }

    Ok(url.to_string())
}

fn build_headers(profile: &ProviderProfile, config: &GatewayConfig) -> Vec<(String, String)> {
    let mut headers = vec![("content-type".to_string(), "application/json".to_string())];

    match profile.auth_scheme {
        AuthScheme::BearerHeader => headers.push((
            "authorization".to_string(),
            format!("Bearer {}", config.api_key),
        )),
        AuthScheme::ApiKeyHeader(name) => headers.push((name.to_string(), config.api_key.clone())),
        AuthScheme::QueryParam(_) => {}
    }

    headers.extend(
        profile
            .extra_headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
    );
    headers
}

// ── Body builders referenced by the provider registry ───────────────

/// Body for OpenAI-compatible chat completions.
pub fn chat_completions_body(params: &BodyParams<'_>) -> Value {
    let messages: Vec<Value> = params
        .messages
        .iter()
        .map(|m| {
            let content = if m.images.is_empty() {
                Value::String(m.content.clone())
            } else {
                let mut parts: Vec<Value> = m
                    .images
                    .iter()
                    .map(|image| {
                        let url = if params.raw_image_base64 {
                            image.base64.clone()
                        } else {
                            image.data_uri()
                        };
                        json!({ "type": "image_url", "image_url": { "url": url } })
                    })
                    .collect();
                parts.push(json!({ "type": "text", "text": m.content }));
                Value::Array(parts)
            };
            json!({ "role": m.role.as_str(), "content": content })
        })
        .collect();

    json!({
        "model": params.model,
        "messages": messages,
        "max_tokens": params.max_tokens,
        "stream": params.stream,
    })
}

/// Body for Anthropic messages.
pub fn anthropic_body(params: &BodyParams<'_>) -> Value {
    let messages: Vec<Value> = params
        .messages
        .iter()
        .map(|m| {
            let content = if m.images.is_empty() {
                Value::String(m.content.clone())
            } else {
                let mut parts: Vec<Value> = m
                    .images
                    .iter()
                    .map(|image| {
                        json!({
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": image.media_type,
                                "data": image.base64,
                            }
                        })
                    })
                    .collect();
                parts.push(json!({ "type": "text", "text": m.content }));
                Value::Array(parts)
            };
            json!({ "role": m.role.as_str(), "content": content })
        })
        .collect();

    json!({
        "model": params.model,
        "messages": messages,
        "max_tokens": params.max_tokens,
        "stream": params.stream,
    })
}

/// Body for Gemini `generateContent`; the endpoint has no stream flag.
pub fn gemini_body(params: &BodyParams<'_>) -> Value {
    let contents: Vec<Value> = params
        .messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::Assistant => "model",
                Role::User | Role::System => "user",
            };
            let mut parts: Vec<Value> = m
                .images
                .iter()
                .map(|image| {
                    json!({
                        "inline_data": { "mime_type": image.media_type, "data": image.base64 }
                    })
                })
                .collect();
            parts.push(json!({ "text": m.content }));
            json!({ "role": role, "parts": parts })
        })
        .collect();

    json!({
        "contents": contents,
        "generationConfig": { "maxOutputTokens": params.max_tokens },
    })
}
