// TimeFlow Engine — Configuration
// One struct assembled from the environment. A missing API key is a normal
// state (AI offline, inputs queue up) and must never fail construction —
// the queue and the classifier fallback are the degradation path.

use crate::atoms::constants::{
    API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, DRAIN_COOLDOWN_SECS, DRAIN_TICK_SECS,
    INTENT_TIMEOUT_SECS, INTER_ITEM_DELAY_MS, PROCESS_TIMEOUT_SECS,
};
use log::warn;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// AI credential; `None` means every AI-backed path degrades to
    /// queue/fallback behavior.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,

    /// Interval between background drain ticks. Fixed — never grows under
    /// sustained failure.
    pub drain_tick: Duration,
    /// Minimum spacing between failed drain attempts.
    pub drain_cooldown: Duration,
    /// Per-attempt bound on intent classification during a drain.
    pub intent_timeout: Duration,
    /// Per-attempt bound on downstream processing during a drain.
    pub process_timeout: Duration,
    /// Pause between successive items when clearing a backlog.
    pub inter_item_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            drain_tick: Duration::from_secs(DRAIN_TICK_SECS),
            drain_cooldown: Duration::from_secs(DRAIN_COOLDOWN_SECS),
            intent_timeout: Duration::from_secs(INTENT_TIMEOUT_SECS),
            process_timeout: Duration::from_secs(PROCESS_TIMEOUT_SECS),
            inter_item_delay: Duration::from_millis(INTER_ITEM_DELAY_MS),
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment. Never fails: absent values
    /// fall back to defaults, and an absent key just means offline mode.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("[config] {API_KEY_ENV} not set — starting in offline mode");
        }

        let mut config = EngineConfig { api_key, ..EngineConfig::default() };
        if let Ok(url) = std::env::var("TIMEFLOW_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(model) = std::env::var("TIMEFLOW_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        config
    }

    pub fn offline(&self) -> bool {
        self.api_key.is_none()
    }
}
