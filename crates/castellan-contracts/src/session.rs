//! Session credential types.
//!
//! `SessionCredential` is what the caller receives at login. `SessionRecord`
//! is what the session registry keeps: it is keyed by the credential's
//! accessor (a SHA-256 digest of the token) and never holds the token itself.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::CapabilitySet;
use crate::claims::RoleName;

/// The opaque credential handed back to a caller after a successful login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    /// The secret bearer value presented on every subsequent request.
    pub token: String,
    /// Non-secret handle for the credential, safe to log and audit.
    pub accessor: String,
    pub role: RoleName,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionCredential {
    /// Lifetime in whole seconds.
    pub fn ttl_secs(&self) -> u64 {
        (self.expires_at - self.issued_at).num_seconds().max(0) as u64
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"<redacted>")
            .field("accessor", &self.accessor)
            .field("role", &self.role)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Lifecycle state of a credential at a given instant.
///
/// `Active` is entered on issuance. `Expired` and `Revoked` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    Active,
    Expired,
    Revoked,
}

/// The registry's binding of a credential to its capability snapshot.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub accessor: String,
    pub role: RoleName,
    /// Snapshot taken at issuance; shared, never mutated.
    pub capabilities: Arc<CapabilitySet>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Lifecycle state at `now`. Revocation takes precedence over expiry, and
    /// the instant `expires_at` itself is already expired.
    pub fn state_at(&self, now: DateTime<Utc>) -> CredentialState {
        if self.revoked_at.is_some() {
            CredentialState::Revoked
        } else if now >= self.expires_at {
            CredentialState::Expired
        } else {
            CredentialState::Active
        }
    }
}
