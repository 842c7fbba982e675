//! # castellan-policy
//!
//! A TOML-driven, closed-set role resolver for the CASTELLAN broker.
//!
//! ## Overview
//!
//! This crate provides [`TomlRoleResolver`], which implements the
//! [`RoleResolver`](castellan_core::traits::RoleResolver) trait. Roles are
//! declared in a TOML file keyed by role name; each role lists the path
//! grants it confers. A token's role claim resolves only through an exact
//! allow-list lookup.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use castellan_policy::engine::TomlRoleResolver;
//!
//! let resolver = TomlRoleResolver::from_file(Path::new("policies/vault.toml"))?;
//! // Pass `resolver` to `castellan_core::Broker::new(...)`.
//! ```
//!
//! ## Rule matching
//!
//! Each rule has a `path` pattern (`*`, trailing-`*` prefix, `+` segment
//! wildcard, or exact) and an `operations` list. When several rules match a
//! path the most specific pattern wins; equally specific rules intersect.

pub mod engine;
pub mod rule;

pub use engine::TomlRoleResolver;
pub use rule::{PolicyConfig, RoleConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use castellan_contracts::{
        capability::Operation,
        claims::{Audience, ClaimSet, RoleName},
        decision::AccessDecision,
        error::{BrokerError, DenyReason, ResolutionError},
    };
    use castellan_core::traits::RoleResolver;

    use crate::TomlRoleResolver;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const VAULT_ROLES: &str = r#"
        [roles.admin]
        login_names = ["admin-builds"]
        bound_claims = { env = "dev" }

        [[roles.admin.rules]]
        path = "*"
        operations = ["read", "write"]

        [roles.developer]
        login_names = ["developer-builds"]

        [[roles.developer.rules]]
        path = "kv/data/jobs/*"
        operations = ["read", "write", "list"]

        [roles.readonly]
        login_names = ["readonly-builds"]

        [[roles.readonly.rules]]
        path = "kv/data/jobs/*"
        operations = ["read"]
    "#;

    /// Claims carrying `role` and `env = "dev"`.
    fn claims(role: Option<&str>) -> ClaimSet {
        let mut extra = serde_json::Map::new();
        if let Some(role) = role {
            extra.insert("role".to_string(), serde_json::json!(role));
        }
        extra.insert("env".to_string(), serde_json::json!("dev"));
        ClaimSet {
            iss: "http://localhost:8080".to_string(),
            aud: Audience::Single("vault".to_string()),
            sub: None,
            iat: 0,
            nbf: 0,
            exp: i64::MAX,
            extra,
        }
    }

    // ── 1. exact resolution ───────────────────────────────────────────────────

    /// Each role claim resolves to exactly the role configured under that name.
    #[test]
    fn test_resolves_configured_role_by_name() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();

        for name in RoleName::ALL {
            let role = resolver.resolve(&claims(Some(name.as_str())), name.as_str()).unwrap();
            assert_eq!(role.name, name);
            assert_eq!(role, resolver.role(name).unwrap());
        }
    }

    // ── 2. login aliases ──────────────────────────────────────────────────────

    #[test]
    fn test_login_alias_accepted() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();
        let role = resolver.resolve(&claims(Some("admin")), "admin-builds").unwrap();
        assert_eq!(role.name, RoleName::Admin);
    }

    /// Asking for `admin-builds` with a readonly token must not escalate.
    #[test]
    fn test_login_role_mismatch() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();
        let err = resolver.resolve(&claims(Some("readonly")), "admin-builds").unwrap_err();
        assert_eq!(
            err,
            ResolutionError::LoginRoleMismatch {
                requested: "admin-builds".to_string(),
                role: "readonly".to_string(),
            }
        );
    }

    // ── 3. unknown / missing role ─────────────────────────────────────────────

    #[test]
    fn test_unknown_role_has_no_fallback() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();

        for raw in ["root", "Admin", "admin ", ""] {
            match resolver.resolve(&claims(Some(raw)), raw) {
                Err(ResolutionError::UnknownRole { role }) => assert_eq!(role, raw),
                other => panic!("expected UnknownRole for {raw:?}, got {:?}", other),
            }
        }
    }

    /// A role in the closed set that the file does not configure is unknown too.
    #[test]
    fn test_unconfigured_role_is_unknown() {
        let toml = r#"
            [[roles.readonly.rules]]
            path = "kv/data/jobs/*"
            operations = ["read"]
        "#;
        let resolver = TomlRoleResolver::from_toml_str(toml).unwrap();
        assert!(matches!(
            resolver.resolve(&claims(Some("admin")), "admin"),
            Err(ResolutionError::UnknownRole { .. })
        ));
    }

    #[test]
    fn test_missing_role_claim() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();
        assert_eq!(
            resolver.resolve(&claims(None), "admin").unwrap_err(),
            ResolutionError::MissingRoleClaim {
                claim: "role".to_string()
            }
        );
    }

    #[test]
    fn test_custom_role_claim_name() {
        let toml = r#"
            role_claim = "env"

            [[roles.developer.rules]]
            path = "kv/*"
            operations = ["read"]
        "#;
        let resolver = TomlRoleResolver::from_toml_str(toml).unwrap();
        let mut c = claims(None);
        c.extra.insert("env".to_string(), serde_json::json!("developer"));
        assert_eq!(resolver.resolve(&c, "developer").unwrap().name, RoleName::Developer);
    }

    // ── 4. bound claims ───────────────────────────────────────────────────────

    #[test]
    fn test_bound_claim_mismatch() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();
        let mut c = claims(Some("admin"));
        c.extra.insert("env".to_string(), serde_json::json!("prod"));

        assert_eq!(
            resolver.resolve(&c, "admin").unwrap_err(),
            ResolutionError::BoundClaimMismatch {
                claim: "env".to_string()
            }
        );

        c.extra.remove("env");
        assert!(matches!(
            resolver.resolve(&c, "admin"),
            Err(ResolutionError::BoundClaimMismatch { .. })
        ));
    }

    // ── 5. capabilities from TOML ─────────────────────────────────────────────

    #[test]
    fn test_resolved_capabilities_follow_rules() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();
        let readonly = resolver.role(RoleName::Readonly).unwrap();

        assert_eq!(
            readonly.capabilities.evaluate("kv/data/jobs/test-job/db-password", Operation::Read),
            AccessDecision::Allow
        );
        assert_eq!(
            readonly.capabilities.evaluate("kv/data/jobs/test-job/db-password", Operation::Write),
            AccessDecision::Deny(DenyReason::OperationNotGranted)
        );
        assert_eq!(
            readonly.capabilities.evaluate("kv/data/admin/admin-secret", Operation::Read),
            AccessDecision::Deny(DenyReason::PathNotGranted)
        );
    }

    // ── 6. reload keeps old snapshots intact ──────────────────────────────────

    #[test]
    fn test_reload_does_not_touch_existing_snapshot() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();
        let before = resolver.resolve(&claims(Some("readonly")), "readonly").unwrap();
        let snapshot = std::sync::Arc::clone(&before.capabilities);

        resolver
            .reload_from_toml_str(
                r#"
                [[roles.readonly.rules]]
                path = "*"
                operations = ["read", "write", "list", "delete"]
                "#,
            )
            .unwrap();

        let after = resolver.resolve(&claims(Some("readonly")), "readonly").unwrap();
        assert!(after.capabilities.evaluate("kv/data/admin/x", Operation::Delete).is_allowed());
        assert_eq!(
            snapshot.evaluate("kv/data/admin/x", Operation::Delete),
            AccessDecision::Deny(DenyReason::PathNotGranted)
        );
    }

    #[test]
    fn test_failed_reload_keeps_current_table() {
        let resolver = TomlRoleResolver::from_toml_str(VAULT_ROLES).unwrap();
        assert!(resolver.reload_from_toml_str("[roles.root]").is_err());
        assert!(resolver.role(RoleName::Admin).is_some());
    }

    // ── 7. configuration errors ───────────────────────────────────────────────

    #[test]
    fn test_toml_parse_error() {
        match TomlRoleResolver::from_toml_str("this is not valid toml ][[[") {
            Err(BrokerError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse policy TOML"), "got: {reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_role_outside_closed_set_rejected() {
        let toml = r#"
            [[roles.superuser.rules]]
            path = "*"
            operations = ["read"]
        "#;
        match TomlRoleResolver::from_toml_str(toml) {
            Err(BrokerError::ConfigError { reason }) => {
                assert!(reason.contains("superuser"), "got: {reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_pattern_and_operation_rejected() {
        let bad_pattern = r#"
            [[roles.admin.rules]]
            path = "kv/*/x"
            operations = ["read"]
        "#;
        assert!(matches!(
            TomlRoleResolver::from_toml_str(bad_pattern),
            Err(BrokerError::ConfigError { .. })
        ));

        let bad_op = r#"
            [[roles.admin.rules]]
            path = "kv/*"
            operations = ["sudo"]
        "#;
        assert!(matches!(
            TomlRoleResolver::from_toml_str(bad_op),
            Err(BrokerError::ConfigError { .. })
        ));
    }
}
