//! # castellan-session
//!
//! Issues opaque session credentials and keeps the registry that binds each
//! one to the capability snapshot of the role it was issued for.
//!
//! Tokens are `cst.` plus 64 hex characters drawn from the OS random source.
//! The registry is keyed by the token's SHA-256 accessor, so a dump of the
//! registry or the audit log never contains a presentable credential.

pub mod config;
pub mod memory;
pub mod token;

pub use config::SessionConfig;
pub use memory::InMemorySessionStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};

    use castellan_contracts::{
        capability::{Operation, PathPattern, PolicyRule, Role},
        claims::RoleName,
        decision::AccessDecision,
        error::{BrokerError, DenyReason},
        session::CredentialState,
    };
    use castellan_core::{enforcer::authorize, traits::SessionStore};

    use crate::{config, token, InMemorySessionStore, SessionConfig};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn readonly() -> Role {
        Role::new(
            RoleName::Readonly,
            vec![PolicyRule::new(
                PathPattern::parse("kv/data/jobs/*").unwrap(),
                [Operation::Read],
            )],
        )
    }

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(Duration::seconds(300))
    }

    // ── 1. token format ───────────────────────────────────────────────────────

    #[test]
    fn test_token_format_and_uniqueness() {
        let tokens: HashSet<String> = (0..64).map(|_| token::generate_token().unwrap()).collect();
        assert_eq!(tokens.len(), 64);

        for t in &tokens {
            let body = t.strip_prefix(token::TOKEN_PREFIX).unwrap();
            assert_eq!(body.len(), 64);
            assert!(body.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_accessor_is_stable_digest() {
        let a = token::accessor("cst.abc");
        assert_eq!(a, token::accessor("cst.abc"));
        assert_ne!(a, token::accessor("cst.abd"));
        assert_eq!(a.len(), 64);
        assert!(!a.contains("abc"));
    }

    // ── 2. issuance ───────────────────────────────────────────────────────────

    #[test]
    fn test_issue_binds_role_and_ttl() {
        let store = store();
        let role = readonly();
        let cred = store.issue(&role, t0()).unwrap();

        assert_eq!(cred.role, RoleName::Readonly);
        assert_eq!(cred.issued_at, t0());
        assert_eq!(cred.expires_at, t0() + Duration::seconds(300));
        assert_eq!(cred.ttl_secs(), 300);
        assert_eq!(cred.accessor, token::accessor(&cred.token));

        let record = store.lookup(&cred.token).unwrap();
        assert_eq!(record.accessor, cred.accessor);
        assert!(Arc::ptr_eq(&record.capabilities, &role.capabilities));
        assert_eq!(record.state_at(t0()), CredentialState::Active);
    }

    /// The registry never stores the token itself.
    #[test]
    fn test_lookup_by_accessor_fails() {
        let store = store();
        let cred = store.issue(&readonly(), t0()).unwrap();
        assert!(store.lookup(&cred.accessor).is_none());
        assert!(store.lookup("cst.unknown").is_none());
    }

    #[test]
    fn test_each_login_gets_a_distinct_credential() {
        let store = store();
        let role = readonly();
        let a = store.issue(&role, t0()).unwrap();
        let b = store.issue(&role, t0()).unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(store.len(), 2);
    }

    // ── 3. expiry ─────────────────────────────────────────────────────────────

    #[test]
    fn test_expiry_boundary() {
        let store = store();
        let cred = store.issue(&readonly(), t0()).unwrap();
        let path = "kv/data/jobs/test-job/db-password";

        let just_before = cred.expires_at - Duration::seconds(1);
        let record = store.lookup(&cred.token);
        assert_eq!(
            authorize(record.as_ref(), path, Operation::Read, just_before),
            AccessDecision::Allow
        );
        assert_eq!(
            authorize(record.as_ref(), path, Operation::Read, cred.expires_at),
            AccessDecision::Deny(DenyReason::CredentialExpired)
        );
    }

    // ── 4. revocation ─────────────────────────────────────────────────────────

    #[test]
    fn test_revoke_is_final_and_idempotent() {
        let store = store();
        let cred = store.issue(&readonly(), t0()).unwrap();
        let later = t0() + Duration::seconds(10);

        assert!(store.revoke(&cred.token, later));
        assert!(!store.revoke(&cred.token, later));
        assert!(!store.revoke("cst.unknown", later));

        let record = store.lookup(&cred.token).unwrap();
        assert_eq!(record.revoked_at, Some(later));
        assert_eq!(
            authorize(Some(&record), "kv/data/jobs/x", Operation::Read, later),
            AccessDecision::Deny(DenyReason::CredentialRevoked)
        );
    }

    #[test]
    fn test_expired_credential_cannot_be_revoked() {
        let store = store();
        let cred = store.issue(&readonly(), t0()).unwrap();
        assert!(!store.revoke(&cred.token, cred.expires_at));
        assert_eq!(
            store.lookup(&cred.token).unwrap().state_at(cred.expires_at),
            CredentialState::Expired
        );
    }

    // ── 5. sweep ──────────────────────────────────────────────────────────────

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = store();
        let role = readonly();
        let old = store.issue(&role, t0()).unwrap();
        let revoked = store.issue(&role, t0()).unwrap();
        let fresh = store.issue(&role, t0() + Duration::seconds(200)).unwrap();
        store.revoke(&revoked.token, t0() + Duration::seconds(1));

        // Revoked entries stay until their own expiry.
        assert_eq!(store.sweep(t0() + Duration::seconds(299)), 0);
        assert!(store.lookup(&revoked.token).is_some());

        assert_eq!(store.sweep(t0() + Duration::seconds(300)), 2);
        assert!(store.lookup(&old.token).is_none());
        assert!(store.lookup(&revoked.token).is_none());
        assert!(store.lookup(&fresh.token).is_some());
        assert_eq!(store.len(), 1);
    }

    // ── 6. concurrency ────────────────────────────────────────────────────────

    #[test]
    fn test_concurrent_issue_authorize_revoke() {
        let store = store();
        let role = readonly();
        let now = t0() + Duration::seconds(1);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        let cred = store.issue(&role, t0()).unwrap();
                        let record = store.lookup(&cred.token);
                        assert!(authorize(record.as_ref(), "kv/data/jobs/a", Operation::Read, now)
                            .is_allowed());
                        assert!(store.revoke(&cred.token, now));
                        let record = store.lookup(&cred.token);
                        assert_eq!(
                            authorize(record.as_ref(), "kv/data/jobs/a", Operation::Read, now),
                            AccessDecision::Deny(DenyReason::CredentialRevoked)
                        );
                    }
                });
            }
        });

        assert_eq!(store.len(), 400);
        assert_eq!(store.sweep(t0() + Duration::seconds(300)), 400);
        assert!(store.is_empty());
    }

    // ── 7. configuration ──────────────────────────────────────────────────────

    #[test]
    fn test_config_defaults_to_five_minutes() {
        let config = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(config.ttl_secs, 300);
        assert_eq!(config, SessionConfig::default());

        let store = InMemorySessionStore::from_config(&config).unwrap();
        assert_eq!(store.ttl(), Duration::seconds(300));
    }

    #[test]
    fn test_config_custom_ttl() {
        let config = SessionConfig::from_toml_str("ttl_secs = 60").unwrap();
        let store = InMemorySessionStore::from_config(&config).unwrap();
        let cred = store.issue(&readonly(), t0()).unwrap();
        assert_eq!(cred.ttl_secs(), 60);
    }

    #[test]
    fn test_config_rejects_zero_ttl() {
        match SessionConfig::from_toml_str("ttl_secs = 0") {
            Err(BrokerError::ConfigError { reason }) => assert!(reason.contains("ttl_secs")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
        assert!(matches!(
            SessionConfig::from_toml_str("ttl_secs = \"soon\""),
            Err(BrokerError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_config_rejects_ttl_above_maximum() {
        let at_max = format!("ttl_secs = {}", config::MAX_TTL_SECS);
        assert!(SessionConfig::from_toml_str(&at_max).is_ok());

        for huge in [config::MAX_TTL_SECS + 1, 9_223_372_036_854_775_807] {
            match SessionConfig::from_toml_str(&format!("ttl_secs = {huge}")) {
                Err(BrokerError::ConfigError { reason }) => assert!(reason.contains("maximum")),
                other => panic!("expected ConfigError, got {:?}", other),
            }
        }

        // A struct built in code bypasses parsing but not `ttl()`.
        let config = SessionConfig {
            ttl_secs: u64::MAX,
        };
        assert!(matches!(
            InMemorySessionStore::from_config(&config),
            Err(BrokerError::ConfigError { .. })
        ));
    }

    /// An expiry past the end of the calendar fails issuance instead of
    /// panicking, and leaves no record behind.
    #[test]
    fn test_issue_with_overflowing_expiry_fails() {
        let store = InMemorySessionStore::new(Duration::days(365_000_000));
        match store.issue(&readonly(), t0()) {
            Err(BrokerError::IssuanceFailed { reason }) => assert!(reason.contains("overflows")),
            other => panic!("expected IssuanceFailed, got {:?}", other),
        }
        assert!(store.is_empty());
    }
}
