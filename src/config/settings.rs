//! Gateway configuration records and the persisted settings shape.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gateway::provider;
use crate::gateway::Result;

/// Placeholder shown in place of a stored credential.
///
/// An update carrying this value keeps the stored credential.
pub const REDACTED_KEY: &str = "***";

/// Connection settings for one provider.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Provider identifier.
    pub provider: String,
    /// Opaque credential.
    pub api_key: String,
    /// Selected model identifier.
    pub model: String,
    /// Whether the gateway may use this configuration.
    pub enabled: bool,
    /// Replacement for the profile's base URL.
    pub base_url: Option<String>,
}

/// Secondary configuration used for image recognition.
pub type VisionConfig = GatewayConfig;

impl GatewayConfig {
    /// Returns true when the configuration is enabled and has a credential.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }

    /// Returns the base URL override, ignoring blank values.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Returns true when a credential is stored.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        ""
    } else {
        REDACTED_KEY
    }
}

/// Persisted AI settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    /// Active provider identifier.
    pub provider: String,
    /// Active provider credential.
    pub api_key: String,
    /// Active model.
    pub model: String,
    /// Whether the AI features are enabled.
    pub enabled: bool,
    /// Base URL override for the active provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Vision provider identifier.
    pub vision_provider: String,
    /// Vision provider credential.
    pub vision_api_key: String,
    /// Vision model.
    pub vision_model: String,
    /// Whether the vision provider is enabled.
    pub vision_enabled: bool,
    /// Base URL override for the vision provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_base_url: Option<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            api_key: String::new(),
            model: "deepseek-chat".to_string(),
            enabled: false,
            base_url: None,
            vision_provider: "zhipu".to_string(),
            vision_api_key: String::new(),
            vision_model: "glm-4v".to_string(),
            vision_enabled: false,
            vision_base_url: None,
        }
    }
}

impl fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSettings")
            .field("gateway", &self.gateway())
            .field("vision", &self.vision())
            .finish()
    }
}

impl AiSettings {
    /// Returns the active provider configuration.
    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            provider: self.provider.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            enabled: self.enabled,
            base_url: self.base_url.clone(),
        }
    }

    /// Returns the vision provider configuration.
    pub fn vision(&self) -> VisionConfig {
        GatewayConfig {
            provider: self.vision_provider.clone(),
            api_key: self.vision_api_key.clone(),
            model: self.vision_model.clone(),
            enabled: self.vision_enabled,
            base_url: self.vision_base_url.clone(),
        }
    }

    /// Replaces the active provider configuration.
    pub fn set_gateway(&mut self, config: GatewayConfig) {
        self.provider = config.provider;
        self.api_key = config.api_key;
        self.model = config.model;
        self.enabled = config.enabled;
        self.base_url = config.base_url;
    }

    /// Replaces the vision provider configuration.
    pub fn set_vision(&mut self, config: VisionConfig) {
        self.vision_provider = config.provider;
        self.vision_api_key = config.api_key;
        self.vision_model = config.model;
        self.vision_enabled = config.enabled;
        self.vision_base_url = config.base_url;
    }

    /// Returns a copy with stored credentials replaced by [`REDACTED_KEY`].
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            api_key: redact(&self.api_key).to_string(),
            vision_api_key: redact(&self.vision_api_key).to_string(),
            ..self.clone()
        }
    }

    /// Applies a partial update.
    ///
    /// Provider identifiers are checked against the registry. Switching
    /// provider without naming a model selects the new provider's default
    /// model.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<()> {
        if let Some(id) = update.provider {
            let profile = provider::profile(&id)?;
            if profile.id != self.provider && update.model.is_none() {
                self.model = profile.default_model.to_string();
            }
            self.provider = profile.id.to_string();
        }
        if let Some(model) = update.model {
            self.model = model.trim().to_string();
        }
        if let Some(key) = update.api_key {
            apply_key(&mut self.api_key, key);
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(url) = update.base_url {
            self.base_url = non_blank(url);
        }

        if let Some(id) = update.vision_provider {
            let profile = provider::profile(&id)?;
            if profile.id != self.vision_provider && update.vision_model.is_none() {
                self.vision_model = profile.default_model.to_string();
            }
            self.vision_provider = profile.id.to_string();
        }
        if let Some(model) = update.vision_model {
            self.vision_model = model.trim().to_string();
        }
        if let Some(key) = update.vision_api_key {
            apply_key(&mut self.vision_api_key, key);
        }
        if let Some(enabled) = update.vision_enabled {
            self.vision_enabled = enabled;
        }
        if let Some(url) = update.vision_base_url {
            self.vision_base_url = non_blank(url);
        }
        Ok(())
    }
}

fn apply_key(stored: &mut String, key: String) {
    if key != REDACTED_KEY {
        *stored = key.trim().to_string();
    }
}

fn non_blank(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Partial settings update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    /// New active provider.
    pub provider: Option<String>,
    /// New credential, or [`REDACTED_KEY`] to keep the stored one.
    pub api_key: Option<String>,
    /// New model.
    pub model: Option<String>,
    /// New enabled flag.
    pub enabled: Option<bool>,
    /// New base URL; blank clears the override.
    pub base_url: Option<String>,
    /// New vision provider.
    pub vision_provider: Option<String>,
    /// New vision credential, or [`REDACTED_KEY`] to keep the stored one.
    pub vision_api_key: Option<String>,
    /// New vision model.
    pub vision_model: Option<String>,
    /// New vision enabled flag.
    pub vision_enabled: Option<bool>,
    /// New vision base URL; blank clears the override.
    pub vision_base_url: Option<String>,
}
