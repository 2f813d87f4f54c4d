//! JSON file persistence for the configuration store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use super::settings::ConfigUpdate;
use super::store::ConfigStore;
use super::PersistedState;

/// Environment variable overriding the active provider.
pub const ENV_PROVIDER: &str = "FINTRACK_AI_PROVIDER";
/// Environment variable overriding the active credential.
pub const ENV_API_KEY: &str = "FINTRACK_AI_API_KEY";
/// Environment variable overriding the active model.
pub const ENV_MODEL: &str = "FINTRACK_AI_MODEL";
/// Environment variable overriding the vision credential.
pub const ENV_VISION_API_KEY: &str = "FINTRACK_VISION_API_KEY";

/// Reads and writes the AI settings file.
pub struct ConfigManager {
    settings_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self {
            settings_path: Self::default_settings_path(),
        }
    }
}

impl ConfigManager {
    /// Creates a manager for the default settings path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager for a custom settings path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            settings_path: path,
        }
    }

    /// Default settings path (`~/.fintrack/ai-settings.json`).
    pub fn default_settings_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fintrack")
            .join("ai-settings.json")
    }

    /// Path of the settings file.
    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    /// Loads the persisted state; a missing file yields defaults.
    pub fn load_state(&self) -> Result<PersistedState> {
        if !self.settings_path.exists() {
            debug!(path = ?self.settings_path, "Settings file not found, using defaults");
            return Ok(PersistedState::default());
        }

        let content = std::fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings file: {:?}", self.settings_path))?;

        let state: PersistedState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", self.settings_path))?;

        Ok(state)
    }

    /// Writes the persisted state, creating the parent directory if needed.
    pub fn save_state(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {parent:?}"))?;
        }

        let content = serde_json::to_string_pretty(state).context("Failed to serialize settings")?;

        std::fs::write(&self.settings_path, content)
            .with_context(|| format!("Failed to write settings file: {:?}", self.settings_path))?;

        debug!(path = ?self.settings_path, "Saved settings file");
        Ok(())
    }

    /// Loads the settings file into a store, applying environment overrides.
    pub fn load_store(&self) -> Result<ConfigStore> {
        let mut state = self.load_state()?;
        apply_env_overrides_from(&mut state, |name| std::env::var(name).ok())?;
        Ok(ConfigStore::from_persisted(state))
    }

    /// Persists the store's current settings and counters.
    pub fn save_store(&self, store: &ConfigStore) -> Result<()> {
        self.save_state(&store.persisted())
    }
}

/// Applies environment overrides using `lookup` to read variables.
///
/// Unset and blank variables are ignored.
pub fn apply_env_overrides_from<F>(state: &mut PersistedState, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let update = ConfigUpdate {
        provider: var(ENV_PROVIDER),
        api_key: var(ENV_API_KEY),
        model: var(ENV_MODEL),
        vision_api_key: var(ENV_VISION_API_KEY),
        ..ConfigUpdate::default()
    };
    if update == ConfigUpdate::default() {
        return Ok(());
    }

    debug!(
        provider = update.provider.is_some(),
        api_key = update.api_key.is_some(),
        model = update.model.is_some(),
        vision_api_key = update.vision_api_key.is_some(),
        "Applying AI settings from environment"
    );
    state
        .settings
        .apply(update)
        .context("Invalid AI settings in environment")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{AiSettings, UsageCounters};
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = tempdir().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("missing.json"));
        let state = manager.load_state().unwrap();
        assert_eq!(state.settings, AiSettings::default());
        assert_eq!(state.usage, UsageCounters::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("ai-settings.json");
        let manager = ConfigManager::with_path(path.clone());

        let store = ConfigStore::default();
        store
            .update(ConfigUpdate {
                provider: Some("moonshot".to_string()),
                api_key: Some("sk-moon".to_string()),
                enabled: Some(true),
                ..ConfigUpdate::default()
            })
            .unwrap();
        store.record_call_in("2024-04");
        manager.save_store(&store).unwrap();
        assert!(path.exists());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"apiKey\""));
        assert!(raw.contains("\"lastMonth\""));

        let loaded = manager.load_state().unwrap();
        assert_eq!(loaded.settings.provider, "moonshot");
        assert_eq!(loaded.settings.model, "moonshot-v1-8k");
        assert_eq!(loaded.usage.total, 1);
    }

    #[test]
    fn corrupt_file_reports_path() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ai-settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ConfigManager::with_path(path).load_state().unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }

    #[test]
    fn env_overrides_apply_and_blank_is_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_PROVIDER, "openai"),
            (ENV_API_KEY, "sk-env"),
            (ENV_MODEL, " "),
        ]);
        let mut state = PersistedState::default();
        apply_env_overrides_from(&mut state, |name| vars.get(name).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(state.settings.provider, "openai");
        assert_eq!(state.settings.model, "gpt-3.5-turbo");
        assert_eq!(state.settings.api_key, "sk-env");
        assert_eq!(state.settings.vision_api_key, "");
    }

    #[test]
    fn unknown_env_provider_fails() {
        let mut state = PersistedState::default();
        let err = apply_env_overrides_from(&mut state, |name| {
            (name == ENV_PROVIDER).then(|| "acme".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("environment"));
    }
}
