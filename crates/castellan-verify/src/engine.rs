//! JWT claim verifier for the CASTELLAN broker.
//!
//! `JwtClaimVerifier` implements the `ClaimVerifier` trait from
//! `castellan-core`. Verification runs in three phases:
//!
//! 1. **Anchor selection**: the unverified `iss` claim picks the trust
//!    anchor. An issuer with no anchor fails with `UnknownIssuer` before any
//!    key is touched.
//! 2. **Signature and identity**: `jsonwebtoken` checks the signature with
//!    each of the anchor's public keys in turn, then the exact issuer and
//!    audience. Registered claims `exp`, `nbf`, `iss`, `aud` must be present.
//! 3. **Time bounds**: `nbf <= now < exp`, each side widened by the
//!    configured leeway, evaluated against the caller's clock rather than the
//!    library's.
//!
//! Symmetric (HMAC) algorithms are refused at construction: the broker only
//! ever holds public keys.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{debug, warn};

use castellan_contracts::{
    claims::{ClaimSet, ClaimedIdentity},
    error::{BrokerError, BrokerResult, ClaimError},
};
use castellan_core::traits::ClaimVerifier;

use crate::config::{TrustAnchorConfig, TrustConfig};

/// Registered claims that must be present in every accepted token.
const REQUIRED_CLAIMS: [&str; 4] = ["exp", "nbf", "iss", "aud"];

/// `iss` and `sub` read from an unverified payload.
#[derive(Deserialize)]
struct UnverifiedPeek {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    sub: Option<String>,
}

/// A loaded trust anchor: decoded keys plus a prepared `Validation`.
struct TrustAnchor {
    issuer: String,
    audience: String,
    keys: Vec<DecodingKey>,
    validation: Validation,
}

impl TrustAnchor {
    fn from_config(config: &TrustAnchorConfig) -> BrokerResult<Self> {
        let algorithm: Algorithm =
            config
                .algorithm
                .parse()
                .map_err(|e| BrokerError::ConfigError {
                    reason: format!(
                        "unknown algorithm '{}' for issuer '{}': {}",
                        config.algorithm, config.issuer, e
                    ),
                })?;

        let pems = config.load_public_keys()?;
        if pems.is_empty() {
            return Err(BrokerError::ConfigError {
                reason: format!("issuer '{}' has no public keys configured", config.issuer),
            });
        }

        let keys = pems
            .iter()
            .map(|pem| decoding_key(algorithm, pem))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| BrokerError::ConfigError {
                reason: format!("issuer '{}': {}", config.issuer, reason),
            })?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&REQUIRED_CLAIMS);
        // Time bounds are checked against the injected clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            keys,
            validation,
        })
    }
}

fn decoding_key(algorithm: Algorithm, pem: &str) -> Result<DecodingKey, String> {
    let bytes = pem.as_bytes();
    let key = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(bytes),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(bytes),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(bytes),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Err(format!(
                "symmetric algorithm {:?} is not accepted for trust anchors",
                algorithm
            ))
        }
    };
    key.map_err(|e| format!("invalid {:?} public key: {}", algorithm, e))
}

/// Decode the payload without verifying anything.
fn peek(token: &str) -> Result<UnverifiedPeek, ClaimError> {
    let header = jsonwebtoken::decode_header(token).map_err(|e| ClaimError::Malformed {
        reason: e.to_string(),
    })?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<UnverifiedPeek>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| ClaimError::Malformed {
            reason: e.to_string(),
        })
}

/// Read `iss` without verifying anything. Only used to pick an anchor.
fn peek_issuer(token: &str) -> Result<String, ClaimError> {
    peek(token)?.iss.ok_or_else(|| ClaimError::Malformed {
        reason: "missing required claim 'iss'".to_string(),
    })
}

/// The CASTELLAN claim verifier.
///
/// Stateless after construction: every field is immutable, so one instance
/// can be shared by any number of concurrent logins.
pub struct JwtClaimVerifier {
    anchors: Vec<TrustAnchor>,
    leeway_secs: i64,
}

impl JwtClaimVerifier {
    /// Build a verifier from a loaded `TrustConfig`.
    ///
    /// Returns `BrokerError::ConfigError` for unknown or symmetric
    /// algorithms, unreadable or invalid keys, anchors without keys, and
    /// duplicate issuers.
    pub fn new(config: &TrustConfig) -> BrokerResult<Self> {
        let mut seen = HashSet::new();
        let mut anchors = Vec::with_capacity(config.anchors.len());
        for anchor in &config.anchors {
            if !seen.insert(anchor.issuer.as_str()) {
                return Err(BrokerError::ConfigError {
                    reason: format!("issuer '{}' is configured more than once", anchor.issuer),
                });
            }
            anchors.push(TrustAnchor::from_config(anchor)?);
        }

        Ok(Self {
            anchors,
            leeway_secs: i64::try_from(config.leeway_secs).unwrap_or(i64::MAX),
        })
    }

    pub fn from_toml_str(s: &str) -> BrokerResult<Self> {
        Self::new(&TrustConfig::from_toml_str(s)?)
    }

    pub fn from_file(path: &Path) -> BrokerResult<Self> {
        Self::new(&TrustConfig::from_file(path)?)
    }

    fn anchor_for(&self, issuer: &str) -> Option<&TrustAnchor> {
        self.anchors.iter().find(|a| a.issuer == issuer)
    }

    fn check_signature(&self, anchor: &TrustAnchor, token: &str) -> Result<ClaimSet, ClaimError> {
        let mut last = ClaimError::InvalidSignature;
        for key in &anchor.keys {
            match decode::<ClaimSet>(token, key, &anchor.validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => {
                    last = match e.kind() {
                        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                            ClaimError::InvalidSignature
                        }
                        ErrorKind::InvalidIssuer => ClaimError::UnknownIssuer {
                            issuer: anchor.issuer.clone(),
                        },
                        ErrorKind::InvalidAudience => ClaimError::AudienceMismatch {
                            expected: anchor.audience.clone(),
                        },
                        ErrorKind::MissingRequiredClaim(claim) => ClaimError::Malformed {
                            reason: format!("missing required claim '{claim}'"),
                        },
                        _ => ClaimError::Malformed {
                            reason: e.to_string(),
                        },
                    };
                    // Only a signature failure is worth retrying with the next key.
                    if last != ClaimError::InvalidSignature {
                        return Err(last);
                    }
                }
            }
        }
        Err(last)
    }

    fn check_time(&self, claims: &ClaimSet, now: DateTime<Utc>) -> Result<(), ClaimError> {
        let now = now.timestamp();
        if claims.nbf > now.saturating_add(self.leeway_secs) {
            return Err(ClaimError::NotYetValid {
                not_before: claims.nbf,
            });
        }
        if now >= claims.exp.saturating_add(self.leeway_secs) {
            return Err(ClaimError::Expired {
                expired_at: claims.exp,
            });
        }
        Ok(())
    }
}

impl ClaimVerifier for JwtClaimVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, ClaimError> {
        let result = peek_issuer(token).and_then(|issuer| {
            let anchor = self
                .anchor_for(&issuer)
                .ok_or(ClaimError::UnknownIssuer { issuer })?;
            let claims = self.check_signature(anchor, token)?;
            self.check_time(&claims, now)?;
            Ok(claims)
        });

        match &result {
            Ok(claims) => debug!(
                issuer = %claims.iss,
                subject = ?claims.sub,
                "token verified"
            ),
            Err(e) => warn!(error = %e, "token verification failed"),
        }

        result
    }

    fn claimed_identity(&self, token: &str) -> ClaimedIdentity {
        peek(token)
            .map(|p| ClaimedIdentity {
                issuer: p.iss,
                subject: p.sub,
            })
            .unwrap_or_default()
    }
}
