//! The access enforcer: allow/deny for one (credential, path, operation).
//!
//! `authorize` is a pure function of the session record and the request. It
//! performs no I/O and takes no locks, so it can sit on the hot path in front
//! of every storage operation.
//!
//! Checks run in a fixed order and the first failure is the reported reason:
//!
//!   unknown → revoked → expired → path not granted → operation not granted

use chrono::{DateTime, Utc};

use castellan_contracts::{
    capability::Operation,
    decision::AccessDecision,
    error::DenyReason,
    session::{CredentialState, SessionRecord},
};

/// Decide whether `record` permits `operation` on `path` at `now`.
///
/// `record` is `None` when the registry does not know the presented
/// credential.
pub fn authorize(
    record: Option<&SessionRecord>,
    path: &str,
    operation: Operation,
    now: DateTime<Utc>,
) -> AccessDecision {
    let Some(record) = record else {
        return AccessDecision::Deny(DenyReason::CredentialUnknown);
    };

    match record.state_at(now) {
        CredentialState::Revoked => AccessDecision::Deny(DenyReason::CredentialRevoked),
        CredentialState::Expired => AccessDecision::Deny(DenyReason::CredentialExpired),
        CredentialState::Active => record.capabilities.evaluate(path, operation),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use castellan_contracts::{
        capability::{CapabilitySet, Operation, PathPattern, PolicyRule},
        claims::RoleName,
        decision::AccessDecision,
        error::DenyReason,
        session::SessionRecord,
    };

    use super::authorize;

    fn readonly_record() -> SessionRecord {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        SessionRecord {
            accessor: "acc-1".to_string(),
            role: RoleName::Readonly,
            capabilities: Arc::new(CapabilitySet::new(vec![PolicyRule::new(
                PathPattern::parse("kv/data/jobs/*").unwrap(),
                [Operation::Read],
            )])),
            issued_at: issued,
            expires_at: issued + Duration::minutes(5),
            revoked_at: None,
        }
    }

    #[test]
    fn test_unknown_credential() {
        let now = Utc::now();
        assert_eq!(
            authorize(None, "kv/data/jobs/a", Operation::Read, now),
            AccessDecision::Deny(DenyReason::CredentialUnknown)
        );
    }

    #[test]
    fn test_active_credential_consults_capabilities() {
        let record = readonly_record();
        let now = record.issued_at + Duration::seconds(1);

        assert_eq!(
            authorize(Some(&record), "kv/data/jobs/test-job/db-password", Operation::Read, now),
            AccessDecision::Allow
        );
        assert_eq!(
            authorize(Some(&record), "kv/data/jobs/test-job/db-password", Operation::Write, now),
            AccessDecision::Deny(DenyReason::OperationNotGranted)
        );
        assert_eq!(
            authorize(Some(&record), "kv/data/admin/admin-secret", Operation::Read, now),
            AccessDecision::Deny(DenyReason::PathNotGranted)
        );
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let record = readonly_record();
        let path = "kv/data/jobs/test-job/db-password";

        let just_before = record.expires_at - Duration::milliseconds(1);
        assert_eq!(
            authorize(Some(&record), path, Operation::Read, just_before),
            AccessDecision::Allow
        );
        assert_eq!(
            authorize(Some(&record), path, Operation::Read, record.expires_at),
            AccessDecision::Deny(DenyReason::CredentialExpired)
        );
        assert_eq!(
            authorize(Some(&record), path, Operation::Read, record.expires_at + Duration::days(1)),
            AccessDecision::Deny(DenyReason::CredentialExpired)
        );
    }

    #[test]
    fn test_revoked_wins_over_expired_and_grants() {
        let mut record = readonly_record();
        record.revoked_at = Some(record.issued_at);

        for now in [record.issued_at, record.expires_at + Duration::hours(1)] {
            assert_eq!(
                authorize(Some(&record), "kv/data/jobs/a", Operation::Read, now),
                AccessDecision::Deny(DenyReason::CredentialRevoked)
            );
        }
    }

    #[test]
    fn test_repeated_calls_are_idempotent() {
        let record = readonly_record();
        let now = record.issued_at + Duration::seconds(30);
        let first = authorize(Some(&record), "kv/data/jobs/a", Operation::Write, now);
        for _ in 0..10 {
            assert_eq!(authorize(Some(&record), "kv/data/jobs/a", Operation::Write, now), first);
        }
    }
}
