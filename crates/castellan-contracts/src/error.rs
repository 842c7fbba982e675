//! Error taxonomy for the CASTELLAN broker.
//!
//! Three request-scoped classes: `ClaimError` (the token failed
//! verification), `ResolutionError` (the claims map to no usable role), and
//! `DenyReason` (an authorization was refused). `BrokerError` unifies them
//! with configuration and infrastructure failures. None of them is fatal to
//! the broker; each belongs to the single request that produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a JWT failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ClaimError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token issuer '{issuer}' is not a configured trust anchor")]
    UnknownIssuer { issuer: String },

    #[error("token audience does not include '{expected}'")]
    AudienceMismatch { expected: String },

    #[error("token expired at {expired_at}")]
    Expired { expired_at: i64 },

    #[error("token is not valid before {not_before}")]
    NotYetValid { not_before: i64 },

    /// The token could not be decoded or lacks a required claim.
    #[error("token is malformed: {reason}")]
    Malformed { reason: String },
}

/// Why verified claims could not be mapped to a role.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ResolutionError {
    #[error("role '{role}' is not a configured role")]
    UnknownRole { role: String },

    #[error("token carries no '{claim}' claim")]
    MissingRoleClaim { claim: String },

    #[error("login role '{requested}' does not match token role '{role}'")]
    LoginRoleMismatch { requested: String, role: String },

    #[error("claim '{claim}' does not carry the value bound to this role")]
    BoundClaimMismatch { claim: String },
}

/// Why an authorization request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    #[error("credential is not known to this broker")]
    CredentialUnknown,

    #[error("credential has been revoked")]
    CredentialRevoked,

    #[error("credential has expired")]
    CredentialExpired,

    #[error("no policy rule grants access to this path")]
    PathNotGranted,

    #[error("the operation is not granted on this path")]
    OperationNotGranted,
}

/// The unified error type for the CASTELLAN broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("access denied: {0}")]
    Denied(#[from] DenyReason),

    /// A configuration file or value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// An audit sink could not accept a record.
    ///
    /// The broker logs and drops this; it never fails a login or an
    /// authorization because of it.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// The session registry could not mint a credential.
    #[error("session issuance failed: {reason}")]
    IssuanceFailed { reason: String },
}

impl BrokerError {
    /// Stable machine-readable kind, used in `LoginFailure` and audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerError::Claim(e) => match e {
                ClaimError::InvalidSignature => "invalid_signature",
                ClaimError::UnknownIssuer { .. } => "unknown_issuer",
                ClaimError::AudienceMismatch { .. } => "audience_mismatch",
                ClaimError::Expired { .. } => "expired",
                ClaimError::NotYetValid { .. } => "not_yet_valid",
                ClaimError::Malformed { .. } => "malformed_token",
            },
            BrokerError::Resolution(e) => match e {
                ResolutionError::UnknownRole { .. } => "unknown_role",
                ResolutionError::MissingRoleClaim { .. } => "missing_role_claim",
                ResolutionError::LoginRoleMismatch { .. } => "login_role_mismatch",
                ResolutionError::BoundClaimMismatch { .. } => "bound_claim_mismatch",
            },
            BrokerError::Denied(reason) => match reason {
                DenyReason::CredentialUnknown => "credential_unknown",
                DenyReason::CredentialRevoked => "credential_revoked",
                DenyReason::CredentialExpired => "credential_expired",
                DenyReason::PathNotGranted => "path_not_granted",
                DenyReason::OperationNotGranted => "operation_not_granted",
            },
            BrokerError::ConfigError { .. } => "config_error",
            BrokerError::AuditWriteFailed { .. } => "audit_write_failed",
            BrokerError::IssuanceFailed { .. } => "issuance_failed",
        }
    }
}

/// Convenience alias used throughout the CASTELLAN crates.
pub type BrokerResult<T> = Result<T, BrokerError>;
