//! AI settings, usage counters and their persistence.

mod manager;
mod settings;
mod store;
mod usage;

use serde::{Deserialize, Serialize};

pub use manager::{
    apply_env_overrides_from, ConfigManager, ENV_API_KEY, ENV_MODEL, ENV_PROVIDER,
    ENV_VISION_API_KEY,
};
pub use settings::{AiSettings, ConfigUpdate, GatewayConfig, VisionConfig, REDACTED_KEY};
pub use store::ConfigStore;
pub use usage::{current_month, month_key, UsageCounters};

/// On-disk shape of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// AI settings, flattened into the top-level object.
    #[serde(flatten)]
    pub settings: AiSettings,
    /// Call counters.
    #[serde(default)]
    pub usage: UsageCounters,
}
