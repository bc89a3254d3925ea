//! Application state: the generator registry plus loaded configuration.
//!
//! The service keeps no per-learner data. Problems, compiled steps and attempt
//! progress are returned to the caller and handed back on every request.

use tracing::{info, instrument};

use crate::config::{load_app_config_from_env, AppConfig};
use crate::registry::Registry;

pub struct AppState {
    pub registry: Registry,
    pub config: AppConfig,
}

impl AppState {
    /// Build state from env: load the TOML config (or defaults), register families.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_app_config_from_env().unwrap_or_else(|| {
            info!(target: "series_backend", "No series config loaded; using defaults.");
            AppConfig::default()
        });
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Self {
        let registry = Registry::with_defaults(config.generation.max_tries);
        info!(
            target: "series_backend",
            topics = registry.topics().len(),
            default_complexity = config.generation.default_complexity,
            max_tries = config.generation.max_tries,
            "Startup topic catalog"
        );
        Self { registry, config }
    }

    /// Requested complexity, or the configured default.
    pub fn complexity(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.config.generation.default_complexity)
    }
}
