//! In-memory configuration and usage store.
//!
//! Read on every call, written only by explicit saves, updates and recorded
//! calls. Persisting the state is left to the caller (see
//! [`ConfigManager`](super::ConfigManager)).

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use super::settings::{AiSettings, ConfigUpdate, GatewayConfig, VisionConfig};
use super::usage::{current_month, UsageCounters};
use super::PersistedState;
use crate::gateway::Result;

#[derive(Debug, Default)]
struct StoreState {
    settings: AiSettings,
    usage: UsageCounters,
}

/// Cached gateway configuration and usage counters.
#[derive(Debug, Default)]
pub struct ConfigStore {
    state: RwLock<StoreState>,
}

impl ConfigStore {
    /// Creates a store from loaded settings and counters.
    pub fn new(settings: AiSettings, usage: UsageCounters) -> Self {
        Self {
            state: RwLock::new(StoreState { settings, usage }),
        }
    }

    /// Creates a store from a persisted snapshot.
    pub fn from_persisted(state: PersistedState) -> Self {
        Self::new(state.settings, state.usage)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the active provider configuration.
    pub fn load(&self) -> GatewayConfig {
        self.read().settings.gateway()
    }

    /// Returns the vision provider configuration.
    pub fn vision(&self) -> VisionConfig {
        self.read().settings.vision()
    }

    /// Returns the full settings record.
    pub fn settings(&self) -> AiSettings {
        self.read().settings.clone()
    }

    /// Replaces the active provider configuration.
    pub fn save(&self, config: GatewayConfig) {
        info!(
            provider = %config.provider,
            model = %config.model,
            enabled = config.enabled,
            "Saving AI configuration"
        );
        self.write().settings.set_gateway(config);
    }

    /// Replaces the vision provider configuration.
    pub fn save_vision(&self, config: VisionConfig) {
        info!(
            provider = %config.provider,
            model = %config.model,
            enabled = config.enabled,
            "Saving vision configuration"
        );
        self.write().settings.set_vision(config);
    }

    /// Applies a partial update and returns the resulting settings.
    ///
    /// The stored settings are untouched when the update is rejected.
    pub fn update(&self, update: ConfigUpdate) -> Result<AiSettings> {
        let mut state = self.write();
        let mut next = state.settings.clone();
        next.apply(update)?;
        state.settings = next.clone();
        info!(
            provider = %next.provider,
            model = %next.model,
            enabled = next.enabled,
            "Updated AI configuration"
        );
        Ok(next)
    }

    /// Records one successful call in the current month.
    pub fn record_call(&self) -> UsageCounters {
        self.record_call_in(&current_month())
    }

    /// Records one successful call in `month`.
    pub fn record_call_in(&self, month: &str) -> UsageCounters {
        let mut state = self.write();
        state.usage.record(month);
        debug!(monthly = state.usage.monthly, total = state.usage.total, "Recorded AI call");
        state.usage.clone()
    }

    /// Returns the counters as seen from the current month.
    pub fn stats(&self) -> UsageCounters {
        self.stats_in(&current_month())
    }

    /// Returns the counters as seen from `month`.
    pub fn stats_in(&self, month: &str) -> UsageCounters {
        self.read().usage.view_for(month)
    }

    /// Returns a snapshot suitable for persisting.
    pub fn persisted(&self) -> PersistedState {
        let state = self.read();
        PersistedState {
            settings: state.settings.clone(),
            usage: state.usage.clone(),
        }
    }
}
