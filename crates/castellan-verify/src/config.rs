//! Trust-anchor configuration.
//!
//! Each anchor names one issuer, the audience its tokens must carry, the
//! signing algorithm, and the PEM public key(s) that verify its signatures.
//!
//! Example:
//! ```toml
//! leeway_secs = 0
//!
//! [[anchors]]
//! issuer = "http://localhost:8080"
//! audience = "vault"
//! algorithm = "RS256"
//! public_key_files = ["keys/jenkins-oidc.pub"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use castellan_contracts::error::{BrokerError, BrokerResult};

fn default_algorithm() -> String {
    "RS256".to_string()
}

/// One trusted issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustAnchorConfig {
    /// Exact `iss` value.
    pub issuer: String,
    /// Exact `aud` value tokens from this issuer must contain.
    pub audience: String,
    /// JWS algorithm name (`RS256`, `RS384`, `RS512`, `PS256`, `ES256`, `ES384`, `EdDSA`).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Inline PEM public keys.
    #[serde(default)]
    pub public_keys_pem: Vec<String>,
    /// PEM public key files. Relative paths resolve against the directory of
    /// the configuration file when loaded with `TrustConfig::from_file`.
    #[serde(default)]
    pub public_key_files: Vec<PathBuf>,
}

impl TrustAnchorConfig {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        algorithm: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            algorithm: algorithm.into(),
            public_keys_pem: Vec::new(),
            public_key_files: Vec::new(),
        }
    }

    pub fn with_public_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.public_keys_pem.push(pem.into());
        self
    }

    /// Inline PEMs followed by the contents of every key file.
    pub fn load_public_keys(&self) -> BrokerResult<Vec<String>> {
        let mut keys = self.public_keys_pem.clone();
        for path in &self.public_key_files {
            let pem = std::fs::read_to_string(path).map_err(|e| BrokerError::ConfigError {
                reason: format!(
                    "failed to read public key '{}' for issuer '{}': {}",
                    path.display(),
                    self.issuer,
                    e
                ),
            })?;
            keys.push(pem);
        }
        Ok(keys)
    }
}

/// The complete trust configuration for the claim verifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Clock-skew tolerance applied to `nbf` and `exp`. Zero unless set.
    #[serde(default)]
    pub leeway_secs: u64,
    #[serde(default)]
    pub anchors: Vec<TrustAnchorConfig>,
}

impl TrustConfig {
    /// Parse `s` as TOML trust configuration.
    pub fn from_toml_str(s: &str) -> BrokerResult<Self> {
        toml::from_str(s).map_err(|e| BrokerError::ConfigError {
            reason: format!("failed to parse trust TOML: {}", e),
        })
    }

    /// Read and parse the file at `path`, resolving relative key paths
    /// against its parent directory.
    pub fn from_file(path: &Path) -> BrokerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| BrokerError::ConfigError {
            reason: format!("failed to read trust file '{}': {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        if let Some(base) = path.parent() {
            for anchor in &mut config.anchors {
                for key_path in &mut anchor.public_key_files {
                    if key_path.is_relative() {
                        *key_path = base.join(&*key_path);
                    }
                }
            }
        }
        Ok(config)
    }
}
