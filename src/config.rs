//! Loading service configuration (generation knobs + step weights) from TOML.
//!
//! See `AppConfig` and `ScoringConfig` for the expected schema:
//!
//! ```toml
//! [generation]
//! default_complexity = 10
//! max_tries = 1000
//!
//! [scoring]
//! a_n = 2
//! s_n = 2
//! conv = 2
//! reason = 1
//! ```

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_COMPLEXITY: u32 = 10;
pub const DEFAULT_MAX_TRIES: usize = 1000;

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct AppConfig {
  #[serde(default)]
  pub generation: GenerationConfig,
  #[serde(default)]
  pub scoring: ScoringConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
  /// Complexity used when a request does not name one.
  pub default_complexity: u32,
  /// Upper bound for rejection-sampling loops in the generators.
  pub max_tries: usize,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self { default_complexity: DEFAULT_COMPLEXITY, max_tries: DEFAULT_MAX_TRIES }
  }
}

/// Point value of each step key. Absent keys keep their defaults.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
  pub a_n: f64,
  pub s_n: f64,
  pub limit: f64,
  pub conv: f64,
  pub sum: f64,
  pub sum_from_2: f64,
  pub reason: f64,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self { a_n: 2.0, s_n: 2.0, limit: 2.0, conv: 2.0, sum: 2.0, sum_from_2: 1.0, reason: 1.0 }
  }
}

pub fn parse_app_config(text: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(text)
}

/// Attempt to load `AppConfig` from SERIES_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("SERIES_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "series_backend", %path, "Loaded series config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "series_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "series_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_yields_defaults() {
    let cfg = parse_app_config("").unwrap();
    assert_eq!(cfg, AppConfig::default());
    assert_eq!(cfg.generation.default_complexity, DEFAULT_COMPLEXITY);
  }

  #[test]
  fn partial_tables_keep_remaining_defaults() {
    let cfg = parse_app_config("[scoring]\nconv = 5\n\n[generation]\nmax_tries = 50\n").unwrap();
    assert_eq!(cfg.scoring.conv, 5.0);
    assert_eq!(cfg.scoring.a_n, 2.0);
    assert_eq!(cfg.generation.max_tries, 50);
    assert_eq!(cfg.generation.default_complexity, DEFAULT_COMPLEXITY);
  }

  #[test]
  fn malformed_values_are_rejected() {
    assert!(parse_app_config("[scoring]\nconv = \"lots\"\n").is_err());
  }
}
