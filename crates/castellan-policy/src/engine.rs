//! TOML-driven role resolver implementation.
//!
//! `TomlRoleResolver` loads a `PolicyConfig` from a TOML string or file and
//! implements the `RoleResolver` trait from castellan-core.
//!
//! Resolution algorithm:
//!
//! 1. Read the role claim (default `role`). Missing → `MissingRoleClaim`.
//! 2. Parse it through the `RoleName` allow-list. Unknown → `UnknownRole`.
//! 3. Look up the configured role. Not configured → `UnknownRole`.
//! 4. The requested login role must be the role's name or one of its
//!    `login_names`. Otherwise → `LoginRoleMismatch`.
//! 5. Every `bound_claims` entry must match exactly. Otherwise →
//!    `BoundClaimMismatch`.
//!
//! There is no default role: every failure is final.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use castellan_contracts::{
    capability::Role,
    claims::{ClaimSet, RoleName},
    error::{BrokerError, BrokerResult, ResolutionError},
};
use castellan_core::traits::RoleResolver;

use crate::rule::PolicyConfig;

#[derive(Debug)]
struct RoleTable {
    role_claim: String,
    roles: HashMap<RoleName, Arc<Role>>,
}

impl RoleTable {
    fn from_config(config: PolicyConfig) -> BrokerResult<Self> {
        let mut roles = HashMap::new();
        for (key, role_config) in config.roles {
            let name = RoleName::parse(&key).ok_or_else(|| BrokerError::ConfigError {
                reason: format!(
                    "unknown role '{}' in policy file; expected one of: {}",
                    key,
                    RoleName::ALL.map(|r| r.as_str()).join(", ")
                ),
            })?;
            roles.insert(name, Arc::new(role_config.into_role(name)));
        }
        Ok(Self {
            role_claim: config.role_claim,
            roles,
        })
    }
}

/// A `RoleResolver` backed by a TOML role file.
///
/// Roles are immutable once loaded. `reload_from_toml_str` swaps the whole
/// table atomically; sessions issued earlier keep the capability snapshot
/// they were bound to.
///
/// ```rust,ignore
/// use castellan_policy::engine::TomlRoleResolver;
///
/// let resolver = TomlRoleResolver::from_file(Path::new("policies/vault.toml"))?;
/// ```
#[derive(Debug)]
pub struct TomlRoleResolver {
    table: RwLock<Arc<RoleTable>>,
}

impl TomlRoleResolver {
    /// Parse `s` as TOML and build a `TomlRoleResolver`.
    ///
    /// Returns `BrokerError::ConfigError` if the TOML is malformed, does not
    /// match `PolicyConfig`, names a role outside the closed set, or contains
    /// an invalid path pattern.
    pub fn from_toml_str(s: &str) -> BrokerResult<Self> {
        let table = Self::parse_table(s)?;
        Ok(Self {
            table: RwLock::new(Arc::new(table)),
        })
    }

    /// Read the file at `path` and parse it as TOML role configuration.
    pub fn from_file(path: &Path) -> BrokerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| BrokerError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Replace every role with the contents of `s`.
    ///
    /// On error the current table is left untouched.
    pub fn reload_from_toml_str(&self, s: &str) -> BrokerResult<()> {
        let table = Self::parse_table(s)?;
        let role_count = table.roles.len();
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
        info!(roles = role_count, "role configuration reloaded");
        Ok(())
    }

    /// The configured role for `name`, if any.
    pub fn role(&self, name: RoleName) -> Option<Arc<Role>> {
        self.current().roles.get(&name).cloned()
    }

    fn current(&self) -> Arc<RoleTable> {
        Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn parse_table(s: &str) -> BrokerResult<RoleTable> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| BrokerError::ConfigError {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        RoleTable::from_config(config)
    }
}

impl RoleResolver for TomlRoleResolver {
    fn resolve(
        &self,
        claims: &ClaimSet,
        requested_role: &str,
    ) -> Result<Arc<Role>, ResolutionError> {
        let table = self.current();

        let raw = claims.claim_str(&table.role_claim).ok_or_else(|| {
            ResolutionError::MissingRoleClaim {
                claim: table.role_claim.clone(),
            }
        })?;

        let role = RoleName::parse(raw)
            .and_then(|name| table.roles.get(&name))
            .ok_or_else(|| {
                warn!(role = %raw, issuer = %claims.iss, "token names an unconfigured role");
                ResolutionError::UnknownRole {
                    role: raw.to_string(),
                }
            })?;

        if !role.accepts_login_name(requested_role) {
            warn!(
                requested_role = %requested_role,
                role = %role.name,
                "login role does not match token role"
            );
            return Err(ResolutionError::LoginRoleMismatch {
                requested: requested_role.to_string(),
                role: role.name.as_str().to_string(),
            });
        }

        for (claim, expected) in &role.bound_claims {
            if claims.claim_str(claim) != Some(expected.as_str()) {
                warn!(role = %role.name, claim = %claim, "bound claim mismatch");
                return Err(ResolutionError::BoundClaimMismatch {
                    claim: claim.clone(),
                });
            }
        }

        debug!(role = %role.name, rules = role.capabilities.rules().len(), "role resolved");

        Ok(Arc::clone(role))
    }
}
