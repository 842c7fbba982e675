//! Job token minting, standing in for the CI server's OIDC provider.
//!
//! Tokens carry the claims a CI job presents at login: issuer, audience,
//! `env`, `role`, `jenkins_job`, and a validity window that opens ten
//! seconds in the past and closes ten minutes in the future.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use castellan_contracts::error::{BrokerError, BrokerResult};

use crate::deployment::{AUDIENCE, ISSUER};

pub(crate) const JENKINS_SIGNING_KEY: &str = include_str!("../keys/jenkins-oidc.key");
pub(crate) const ROGUE_SIGNING_KEY: &str = include_str!("../keys/rogue-issuer.key");

/// The claims minted into a job token.
#[derive(Debug, Clone, Serialize)]
pub struct JobClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub env: String,
    pub role: String,
    pub jenkins_job: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl JobClaims {
    /// Claims for `job` asking for `role`, valid from `now - 10s` to `now + 10m`.
    pub fn new(issuer: &str, role: &str, job: &str, now: DateTime<Utc>) -> Self {
        let start = (now - Duration::seconds(10)).timestamp();
        Self {
            iss: issuer.to_string(),
            aud: AUDIENCE.to_string(),
            sub: format!("job/{job}"),
            env: "dev".to_string(),
            role: role.to_string(),
            jenkins_job: job.to_string(),
            iat: start,
            nbf: start,
            exp: (now + Duration::minutes(10)).timestamp(),
        }
    }
}

/// Signs job tokens with an RSA private key.
pub struct JobTokenIssuer {
    issuer: String,
    key: EncodingKey,
}

impl JobTokenIssuer {
    pub fn new(issuer: impl Into<String>, private_key_pem: &str) -> BrokerResult<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
            BrokerError::ConfigError {
                reason: format!("invalid RSA signing key: {}", e),
            }
        })?;
        Ok(Self {
            issuer: issuer.into(),
            key,
        })
    }

    /// The trusted CI server.
    pub fn jenkins() -> BrokerResult<Self> {
        Self::new(ISSUER, JENKINS_SIGNING_KEY)
    }

    /// A signer holding a key the broker has never seen, claiming `issuer`.
    pub fn rogue(issuer: impl Into<String>) -> BrokerResult<Self> {
        Self::new(issuer, ROGUE_SIGNING_KEY)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// A token for `job` whose `role` claim is `role`.
    pub fn mint(&self, role: &str, job: &str, now: DateTime<Utc>) -> BrokerResult<String> {
        self.sign(&JobClaims::new(&self.issuer, role, job, now))
    }

    pub fn sign(&self, claims: &JobClaims) -> BrokerResult<String> {
        encode(&Header::new(Algorithm::RS256), claims, &self.key).map_err(|e| {
            BrokerError::IssuanceFailed {
                reason: format!("failed to sign job token: {}", e),
            }
        })
    }
}
