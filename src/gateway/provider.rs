//! Provider profile registry.
//!
//! Each supported provider is described by one [`ProviderProfile`] entry that
//! carries everything the gateway needs to talk to it: endpoint, credential
//! placement, capability flags, selectable models, and the [`WireFormat`]
//! mappings that build request bodies and read text back out of responses.
//! Adding a provider means adding one entry to [`PROVIDERS`].

use std::fmt;

use serde_json::Value;

use super::error::{GatewayError, Result};
use super::format::{self, BodyParams};
use super::normalize;

/// Where the credential goes on the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`.
    BearerHeader,
    /// Vendor-specific header carrying the raw key.
    ApiKeyHeader(&'static str),
    /// Query parameter carrying the raw key.
    QueryParam(&'static str),
}

/// Request and response envelope mappings for one family of wire formats.
#[derive(Clone, Copy)]
pub struct WireFormat {
    /// Short name used in logs.
    pub name: &'static str,
    /// Whether the wire format accepts a leading `system` message.
    pub native_system_role: bool,
    /// Builds the JSON request body.
    pub build_body: fn(&BodyParams<'_>) -> Value,
    /// Extracts the answer text from a complete response envelope.
    pub extract: fn(&Value) -> Option<String>,
    /// Extracts the text delta from one streamed frame.
    pub extract_delta: fn(&Value) -> Option<String>,
}

impl fmt::Debug for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireFormat")
            .field("name", &self.name)
            .field("native_system_role", &self.native_system_role)
            .finish_non_exhaustive()
    }
}

/// OpenAI-compatible `/chat/completions` envelopes.
pub const CHAT_COMPLETIONS: WireFormat = WireFormat {
    name: "chat-completions",
    native_system_role: true,
    build_body: format::chat_completions_body,
    extract: normalize::chat_completions_text,
    extract_delta: normalize::chat_completions_delta,
};

/// Anthropic `/v1/messages` envelopes.
pub const ANTHROPIC_MESSAGES: WireFormat = WireFormat {
    name: "anthropic-messages",
    native_system_role: false,
    build_body: format::anthropic_body,
    extract: normalize::anthropic_text,
    extract_delta: normalize::anthropic_delta,
};

/// Google `generateContent` envelopes.
pub const GEMINI_GENERATE: WireFormat = WireFormat {
    name: "gemini-generate",
    native_system_role: false,
    build_body: format::gemini_body,
    extract: normalize::gemini_text,
    extract_delta: normalize::gemini_text,
};

/// Static description of a supported AI provider.
#[derive(Debug)]
pub struct ProviderProfile {
    /// Registry identifier (lowercase).
    pub id: &'static str,
    /// Human-readable provider name.
    pub display_name: &'static str,
    /// Default base URL; an empty string means the caller must supply one.
    pub base_url: &'static str,
    /// Path appended to the base URL; `{model}` is replaced by the model id.
    pub path_template: &'static str,
    /// Credential placement.
    pub auth_scheme: AuthScheme,
    /// Fixed headers sent with every request.
    pub extra_headers: &'static [(&'static str, &'static str)],
    /// Whether the provider can stream incremental deltas.
    pub supports_streaming: bool,
    /// Whether the provider accepts images in chat messages.
    pub supports_vision: bool,
    /// Whether image parts carry bare base64 instead of a `data:` URI.
    pub raw_image_base64: bool,
    /// Model selected when none is configured.
    pub default_model: &'static str,
    /// Models a configuration may select.
    pub selectable_models: &'static [&'static str],
    /// Envelope mappings.
    pub wire: WireFormat,
}

impl ProviderProfile {
    /// Returns true when `model` is one of the selectable models.
    pub fn is_selectable(&self, model: &str) -> bool {
        self.selectable_models.contains(&model)
    }

    /// Returns true when the configuration must provide its own base URL.
    pub fn requires_base_url(&self) -> bool {
        self.base_url.is_empty()
    }
}

/// Every registered provider.
pub static PROVIDERS: [ProviderProfile; 7] = [
    ProviderProfile {
        id: "deepseek",
        display_name: "DeepSeek",
        base_url: "https://api.deepseek.com",
        path_template: "/v1/chat/completions",
        auth_scheme: AuthScheme::BearerHeader,
        extra_headers: &[],
        supports_streaming: true,
        supports_vision: false,
        raw_image_base64: false,
        default_model: "deepseek-chat",
        selectable_models: &["deepseek-chat", "deepseek-coder", "deepseek-reasoner"],
        wire: CHAT_COMPLETIONS,
    },
    ProviderProfile {
        id: "moonshot",
        display_name: "Moonshot (Kimi)",
        base_url: "https://api.moonshot.cn",
        path_template: "/v1/chat/completions",
        auth_scheme: AuthScheme::BearerHeader,
        extra_headers: &[],
        supports_streaming: true,
        supports_vision: false,
        raw_image_base64: false,
        default_model: "moonshot-v1-8k",
        selectable_models: &["moonshot-v1-8k", "moonshot-v1-32k", "moonshot-v1-128k"],
        wire: CHAT_COMPLETIONS,
    },
    ProviderProfile {
        id: "openai",
        display_name: "OpenAI",
        base_url: "https://api.openai.com",
        path_template: "/v1/chat/completions",
        auth_scheme: AuthScheme::BearerHeader,
        extra_headers: &[],
        supports_streaming: true,
        supports_vision: true,
        raw_image_base64: false,
        default_model: "gpt-3.5-turbo",
        selectable_models: &[
            "gpt-3.5-turbo",
            "gpt-4",
            "gpt-4-turbo",
            "gpt-4o",
            "gpt-4o-mini",
        ],
        wire: CHAT_COMPLETIONS,
    },
    ProviderProfile {
        id: "azure",
        display_name: "Azure OpenAI",
        base_url: "",
        path_template: "/openai/deployments/{model}/chat/completions?api-version=2023-05-15",
        auth_scheme: AuthScheme::ApiKeyHeader("api-key"),
        extra_headers: &[],
        supports_streaming: true,
        supports_vision: false,
        raw_image_base64: false,
        default_model: "gpt-35-turbo",
        selectable_models: &["gpt-35-turbo", "gpt-4"],
        wire: CHAT_COMPLETIONS,
    },
    ProviderProfile {
        id: "anthropic",
        display_name: "Anthropic (Claude)",
        base_url: "https://api.anthropic.com",
        path_template: "/v1/messages",
        auth_scheme: AuthScheme::ApiKeyHeader("x-api-key"),
        extra_headers: &[("anthropic-version", "2023-06-01")],
        supports_streaming: true,
        supports_vision: true,
        raw_image_base64: false,
        default_model: "claude-3-haiku-20240307",
        selectable_models: &[
            "claude-3-haiku-20240307",
            "claude-3-sonnet-20240229",
            "claude-3-opus-20240229",
            "claude-3-5-sonnet-20241022",
        ],
        wire: ANTHROPIC_MESSAGES,
    },
    ProviderProfile {
        id: "google",
        display_name: "Google (Gemini)",
        base_url: "https://generativelanguage.googleapis.com",
        path_template: "/v1beta/models/{model}:generateContent",
        auth_scheme: AuthScheme::QueryParam("key"),
        extra_headers: &[],
        supports_streaming: false,
        supports_vision: false,
        raw_image_base64: false,
        default_model: "gemini-pro",
        selectable_models: &["gemini-pro"],
        wire: GEMINI_GENERATE,
    },
    ProviderProfile {
        id: "zhipu",
        display_name: "Zhipu AI (GLM)",
        base_url: "https://open.bigmodel.cn",
        path_template: "/api/paas/v4/chat/completions",
        auth_scheme: AuthScheme::BearerHeader,
        extra_headers: &[],
        supports_streaming: true,
        supports_vision: true,
        raw_image_base64: true,
        default_model: "glm-4v",
        selectable_models: &["glm-4v", "glm-4v-plus", "glm-4v-flash"],
        wire: CHAT_COMPLETIONS,
    },
];

/// Looks up a provider profile by identifier (case-insensitive).
pub fn profile(provider_id: &str) -> Result<&'static ProviderProfile> {
    let wanted = provider_id.trim();
    PROVIDERS
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| GatewayError::UnknownProvider(provider_id.to_string()))
}

/// Returns every registered provider.
pub fn providers() -> &'static [ProviderProfile] {
    &PROVIDERS
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_provider() {
        let p = profile("deepseek").unwrap();
        assert_eq!(p.display_name, "DeepSeek");
        assert!(p.supports_streaming);
        assert!(p.is_selectable("deepseek-chat"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(profile(" OpenAI ").unwrap().id, "openai");
    }

    #[test]
    fn unknown_provider_fails() {
        let err = profile("acme").unwrap_err();
        assert_eq!(err, GatewayError::UnknownProvider("acme".to_string()));
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = providers().iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), providers().len());
    }

    #[test]
    fn default_model_is_always_selectable() {
        for p in providers() {
            assert!(
                p.is_selectable(p.default_model),
                "{} default model {} is not selectable",
                p.id,
                p.default_model
            );
        }
    }

    #[test]
    fn only_azure_requires_base_url() {
        let requiring: Vec<_> = providers()
            .iter()
            .filter(|p| p.requires_base_url())
            .map(|p| p.id)
            .collect();
        assert_eq!(requiring, vec!["azure"]);
    }

    #[test]
    fn google_does_not_stream() {
        let google = profile("google").unwrap();
        assert!(!google.supports_streaming);
        assert_eq!(google.auth_scheme, AuthScheme::QueryParam("key"));
    }
}
