//! Runtime server configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use stacks_core::policy::CirculationPolicy;

/// Deserialised from `config.toml` overlaid with `STACKS_*` environment
/// variables (nested keys use `__`, e.g. `STACKS_POLICY__DAILY_RATE`).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub policy:     CirculationPolicy,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       8080,
      store_path: PathBuf::from("stacks.db"),
      policy:     CirculationPolicy::default(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional file at `path` and the environment over the
  /// defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("STACKS")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.policy, CirculationPolicy::default());
  }

  #[test]
  fn policy_overrides_keep_other_defaults() {
    let cfg = from_toml(
      r#"
        port = 9000

        [policy]
        daily_rate = "0.50"
        max_renewals = 3
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.policy.daily_rate, dec!(0.50));
    assert_eq!(cfg.policy.max_renewals, 3);
    assert_eq!(cfg.policy.loan_period_days, 14);
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/stacks.toml")).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("stacks.db"));
  }
}
