//! Session registry configuration.
//!
//! ```toml
//! ttl_secs = 300
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use castellan_contracts::error::{BrokerError, BrokerResult};

/// Five minutes.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// One day. Session credentials are meant to be short-lived.
pub const MAX_TTL_SECS: u64 = 86_400;

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of every issued credential, counted from issuance. Unrelated
    /// to the expiry of the JWT that was exchanged for it.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(s: &str) -> BrokerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| BrokerError::ConfigError {
            reason: format!("failed to parse session TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> BrokerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| BrokerError::ConfigError {
            reason: format!("failed to read session file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The TTL as a `chrono::Duration`.
    pub fn ttl(&self) -> BrokerResult<chrono::Duration> {
        self.validate()?;
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| BrokerError::ConfigError {
                reason: format!("ttl_secs {} is out of range", self.ttl_secs),
            })
    }

    fn validate(&self) -> BrokerResult<()> {
        if self.ttl_secs == 0 {
            return Err(BrokerError::ConfigError {
                reason: "ttl_secs must be greater than zero".to_string(),
            });
        }
        if self.ttl_secs > MAX_TTL_SECS {
            return Err(BrokerError::ConfigError {
                reason: format!(
                    "ttl_secs {} exceeds the maximum of {}",
                    self.ttl_secs, MAX_TTL_SECS
                ),
            });
        }
        Ok(())
    }
}
