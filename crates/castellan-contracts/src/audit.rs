//! Audit record types.
//!
//! The broker emits exactly one `AuditRecord` per login, authorization,
//! revocation, or sweep. Records identify sessions by accessor only; the
//! bearer token never appears in an audit stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capability::Operation;
use crate::claims::RoleName;
use crate::decision::AccessDecision;

/// Unique identifier for one audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditId(pub Uuid);

impl AuditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

/// Success or the failure kind and message of a login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    Success { accessor: String, role: RoleName },
    Failure { kind: String, message: String },
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditAction {
    Login {
        requested_role: String,
        /// Issuer and subject the token carried, if it could be decoded.
        issuer: Option<String>,
        subject: Option<String>,
        /// False when `issuer` and `subject` are the token's own unverified
        /// claims, i.e. verification rejected it.
        claims_verified: bool,
        outcome: LoginOutcome,
    },
    Authorize {
        /// `None` when the presented credential is unknown.
        accessor: Option<String>,
        path: String,
        operation: Operation,
        decision: AccessDecision,
    },
    Revoke {
        accessor: Option<String>,
        revoked: bool,
    },
    Sweep {
        removed: usize,
    },
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
}

impl AuditRecord {
    pub fn new(timestamp: DateTime<Utc>, action: AuditAction) -> Self {
        Self {
            id: AuditId::new(),
            timestamp,
            action,
        }
    }
}
