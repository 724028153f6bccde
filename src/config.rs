//! Crate configuration.
//!
//! [`LedgerConfig`] is loaded from `config/config.toml` (optional), with
//! environment variables under the `STATIONLEDGER` prefix taking over when
//! the file is absent or unreadable.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LedgerConfig {
    /// Same-context notifier polling interval, in milliseconds.
    #[serde(default = "default_notifier_poll_ms")]
    pub notifier_poll_ms: u64,
    /// Minimum length for the bulk-delete gate secret.
    #[serde(default = "default_gate_min_secret_len")]
    pub gate_min_secret_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            notifier_poll_ms: default_notifier_poll_ms(),
            gate_min_secret_len: default_gate_min_secret_len(),
        }
    }
}

fn default_notifier_poll_ms() -> u64 {
    1_000
}

fn default_gate_min_secret_len() -> usize {
    4
}

impl LedgerConfig {
    /// Load configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/config.toml").required(false))
            .add_source(Environment::with_prefix("STATIONLEDGER").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new("config/config.toml").exists() {
                    log::warn!(
                        "Failed to load config file, falling back to env. Error: {}",
                        err
                    );
                }
                Config::builder()
                    .add_source(Environment::with_prefix("STATIONLEDGER").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        match settings.get::<LedgerConfig>("ledger") {
            Ok(cfg) => Ok(cfg),
            // A missing section is the common embedded case; defaults apply.
            Err(ConfigError::NotFound(_)) => Ok(LedgerConfig::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Ledger configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }

    /// The notifier poll interval as a [`std::time::Duration`].
    pub fn notifier_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.notifier_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.notifier_poll_ms, 1_000);
        assert_eq!(cfg.gate_min_secret_len, 4);
        assert_eq!(
            cfg.notifier_poll_interval(),
            std::time::Duration::from_secs(1)
        );
    }
}
