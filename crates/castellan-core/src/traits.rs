//! Core trait definitions for the CASTELLAN broker pipeline.
//!
//! These traits define the trust boundary:
//!
//! - `ClaimVerifier`: trusted gate (checks the external JWT)
//! - `RoleResolver`: trusted mapping (claims → closed-set role)
//! - `SessionStore`: the only owner of credential bindings
//! - `AuditSink`: best-effort, fire-and-forget event consumer
//! - `Clock`: the single source of "now"
//!
//! The `Broker` wires them together in the correct order. No session is ever
//! issued unless both the verifier and the resolver succeed.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use castellan_contracts::{
    audit::AuditRecord,
    capability::Role,
    claims::{ClaimSet, ClaimedIdentity},
    error::{BrokerResult, ClaimError, ResolutionError},
    session::{SessionCredential, SessionRecord},
};

/// Verifies an externally issued JWT.
///
/// Implementations must be pure given their configuration: no shared mutable
/// state, safe to call concurrently without locking.
pub trait ClaimVerifier: Send + Sync {
    /// Check signature, issuer, audience, and time bounds of `token` at `now`.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, ClaimError>;

    /// Issuer and subject as `token` states them, without checking anything.
    /// Called only after `verify` failed, to label the audit record.
    fn claimed_identity(&self, _token: &str) -> ClaimedIdentity {
        ClaimedIdentity::default()
    }
}

/// Maps verified claims onto a statically configured role.
pub trait RoleResolver: Send + Sync {
    /// Resolve `claims` to a role, given the role name the caller requested
    /// at login. There is no fallback role.
    fn resolve(&self, claims: &ClaimSet, requested_role: &str)
        -> Result<Arc<Role>, ResolutionError>;
}

/// The registry of issued session credentials.
///
/// Implementations own the credential → capability-set binding exclusively.
/// Every method must hold any internal lock only for the duration of a
/// single map operation.
pub trait SessionStore: Send + Sync {
    /// Mint a credential bound to a snapshot of `role`'s capabilities.
    fn issue(&self, role: &Role, now: DateTime<Utc>) -> BrokerResult<SessionCredential>;

    /// Return the record for `token`, if the registry knows it.
    fn lookup(&self, token: &str) -> Option<SessionRecord>;

    /// Mark `token` revoked. Returns false if the token is unknown or was
    /// already revoked.
    fn revoke(&self, token: &str, now: DateTime<Utc>) -> bool;

    /// Drop every record whose expiry has passed. Returns how many were removed.
    fn sweep(&self, now: DateTime<Utc>) -> usize;

    /// The non-secret accessor for `token`.
    fn accessor_for(&self, token: &str) -> String;
}

/// A consumer of audit records.
///
/// Writes are best-effort: the broker logs and discards any error returned
/// here and never lets it fail a login or an authorization. Implementations
/// must not block on slow downstream consumers.
pub trait AuditSink: Send + Sync {
    fn write(&self, record: &AuditRecord) -> BrokerResult<()>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<T: ClaimVerifier + ?Sized> ClaimVerifier for Arc<T> {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, ClaimError> {
        (**self).verify(token, now)
    }

    fn claimed_identity(&self, token: &str) -> ClaimedIdentity {
        (**self).claimed_identity(token)
    }
}

impl<T: RoleResolver + ?Sized> RoleResolver for Arc<T> {
    fn resolve(
        &self,
        claims: &ClaimSet,
        requested_role: &str,
    ) -> Result<Arc<Role>, ResolutionError> {
        (**self).resolve(claims, requested_role)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn issue(&self, role: &Role, now: DateTime<Utc>) -> BrokerResult<SessionCredential> {
        (**self).issue(role, now)
    }

    fn lookup(&self, token: &str) -> Option<SessionRecord> {
        (**self).lookup(token)
    }

    fn revoke(&self, token: &str, now: DateTime<Utc>) -> bool {
        (**self).revoke(token, now)
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        (**self).sweep(now)
    }

    fn accessor_for(&self, token: &str) -> String {
        (**self).accessor_for(token)
    }
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn write(&self, record: &AuditRecord) -> BrokerResult<()> {
        (**self).write(record)
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
