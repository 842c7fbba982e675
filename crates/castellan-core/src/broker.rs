//! The CASTELLAN broker: JWT login, per-request authorization, revocation.
//!
//! Login runs the trust pipeline in a fixed order:
//!
//!   JWT → ClaimVerifier → RoleResolver → SessionStore::issue → credential
//!
//! A session is only reachable after both verification and resolution
//! succeed; the code path to `SessionStore::issue()` is the last step of
//! `login()` and has no other call site.
//!
//! Every public call emits exactly one audit record. Audit failures are
//! logged and swallowed; they never change the outcome returned to the
//! caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use castellan_contracts::{
    audit::{AuditAction, AuditRecord, LoginOutcome},
    capability::Operation,
    claims::ClaimedIdentity,
    decision::AccessDecision,
    error::{BrokerError, BrokerResult, ClaimError},
    login::{AuthInfo, LoginRequest, LoginResponse},
};

use crate::clock::SystemClock;
use crate::enforcer;
use crate::traits::{AuditSink, ClaimVerifier, Clock, RoleResolver, SessionStore};

/// The broker that sits in front of the secret store.
///
/// Holds only immutable configuration and trait objects that are themselves
/// safe for concurrent use, so one `Broker` can be shared across threads
/// behind an `Arc`.
pub struct Broker {
    verifier: Box<dyn ClaimVerifier>,
    resolver: Box<dyn RoleResolver>,
    sessions: Box<dyn SessionStore>,
    audit: Box<dyn AuditSink>,
    clock: Box<dyn Clock>,
}

impl Broker {
    /// Create a broker using the system clock.
    pub fn new(
        verifier: Box<dyn ClaimVerifier>,
        resolver: Box<dyn RoleResolver>,
        sessions: Box<dyn SessionStore>,
        audit: Box<dyn AuditSink>,
    ) -> Self {
        Self {
            verifier,
            resolver,
            sessions,
            audit,
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the clock. Used to drive expiry deterministically.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Exchange a JWT for a session credential.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Claim` if the token fails verification,
    /// `BrokerError::Resolution` if its claims do not resolve to a configured
    /// role, and `BrokerError::IssuanceFailed` if no credential could be
    /// minted. No credential exists after any error.
    pub fn login(&self, request: &LoginRequest) -> BrokerResult<LoginResponse> {
        let now = self.clock.now();

        debug!(requested_role = %request.role, "login attempt");

        // ── Step 1: Verify the external token ───────────────────────────────
        let claims = match self.verifier.verify(&request.jwt, now) {
            Ok(claims) => claims,
            Err(e) => {
                let mut claimed = self.verifier.claimed_identity(&request.jwt);
                if let ClaimError::UnknownIssuer { issuer } = &e {
                    claimed.issuer.get_or_insert_with(|| issuer.clone());
                }
                return Err(self.login_failed(now, request, claimed, false, e.into()));
            }
        };

        // ── Step 2: Resolve the closed-set role ─────────────────────────────
        let role = match self.resolver.resolve(&claims, &request.role) {
            Ok(role) => role,
            Err(e) => {
                return Err(self.login_failed(
                    now,
                    request,
                    ClaimedIdentity::from(&claims),
                    true,
                    e.into(),
                ));
            }
        };

        // ── Step 3: Issue the session ───────────────────────────────────────
        //
        // Only reachable after steps 1 and 2 both succeeded.
        let credential = match self.sessions.issue(&role, now) {
            Ok(credential) => credential,
            Err(e) => {
                return Err(self.login_failed(
                    now,
                    request,
                    ClaimedIdentity::from(&claims),
                    true,
                    e,
                ));
            }
        };

        info!(
            role = %credential.role,
            accessor = %credential.accessor,
            issuer = %claims.iss,
            expires_at = %credential.expires_at,
            "session issued"
        );

        self.emit(AuditRecord::new(
            now,
            AuditAction::Login {
                requested_role: request.role.clone(),
                issuer: Some(claims.iss.clone()),
                subject: claims.sub.clone(),
                claims_verified: true,
                outcome: LoginOutcome::Success {
                    accessor: credential.accessor.clone(),
                    role: credential.role,
                },
            },
        ));

        let mut metadata = BTreeMap::new();
        metadata.insert("role".to_string(), credential.role.as_str().to_string());
        metadata.insert("login_role".to_string(), request.role.clone());
        metadata.insert("issuer".to_string(), claims.iss.clone());
        if let Some(sub) = &claims.sub {
            metadata.insert("subject".to_string(), sub.clone());
        }

        Ok(LoginResponse {
            auth: AuthInfo::from_credential(&credential, metadata),
        })
    }

    /// Decide whether `token` may perform `operation` on `path`.
    ///
    /// Always returns a definite decision; a denial carries its specific
    /// reason.
    pub fn authorize(&self, token: &str, path: &str, operation: Operation) -> AccessDecision {
        let now = self.clock.now();
        let record = self.sessions.lookup(token);
        let decision = enforcer::authorize(record.as_ref(), path, operation, now);

        match decision {
            AccessDecision::Allow => debug!(
                path = %path,
                operation = %operation,
                "authorization allowed"
            ),
            AccessDecision::Deny(reason) => debug!(
                path = %path,
                operation = %operation,
                reason = %reason,
                "authorization denied"
            ),
        }

        self.emit(AuditRecord::new(
            now,
            AuditAction::Authorize {
                accessor: record.map(|r| r.accessor),
                path: path.to_string(),
                operation,
                decision,
            },
        ));

        decision
    }

    /// Revoke `token` immediately, regardless of its remaining lifetime.
    ///
    /// Returns false if the token is unknown or already revoked.
    pub fn revoke(&self, token: &str) -> bool {
        let now = self.clock.now();
        let revoked = self.sessions.revoke(token, now);
        let accessor = self.sessions.lookup(token).map(|r| r.accessor);

        info!(revoked, accessor = ?accessor, "revocation requested");

        self.emit(AuditRecord::new(now, AuditAction::Revoke { accessor, revoked }));
        revoked
    }

    /// Reclaim memory held by expired sessions. Not required for correctness:
    /// expiry is always checked at authorization time.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let removed = self.sessions.sweep(now);

        debug!(removed, "session sweep complete");

        self.emit(AuditRecord::new(now, AuditAction::Sweep { removed }));
        removed
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn login_failed(
        &self,
        now: DateTime<Utc>,
        request: &LoginRequest,
        identity: ClaimedIdentity,
        claims_verified: bool,
        err: BrokerError,
    ) -> BrokerError {
        warn!(
            requested_role = %request.role,
            issuer = ?identity.issuer,
            subject = ?identity.subject,
            claims_verified,
            kind = err.kind(),
            error = %err,
            "login failed"
        );

        self.emit(AuditRecord::new(
            now,
            AuditAction::Login {
                requested_role: request.role.clone(),
                issuer: identity.issuer,
                subject: identity.subject,
                claims_verified,
                outcome: LoginOutcome::Failure {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                },
            },
        ));

        err
    }

    /// Best-effort audit write.
    fn emit(&self, record: AuditRecord) {
        if let Err(e) = self.audit.write(&record) {
            warn!(audit_id = %record.id.0, error = %e, "audit write dropped");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
