//! Role configuration schema.
//!
//! A `PolicyConfig` is deserialized from TOML and maps each role name to the
//! ordered list of path grants it receives. Role names are keys of the
//! `[roles]` table and must belong to the closed `RoleName` set; anything
//! else is rejected when the file is loaded, not when a token arrives.
//!
//! Example:
//! ```toml
//! role_claim = "role"
//!
//! [roles.readonly]
//! description = "Read job-scoped secrets"
//! login_names = ["readonly-builds"]
//! bound_claims = { env = "dev" }
//!
//! [[roles.readonly.rules]]
//! path = "kv/data/jobs/*"
//! operations = ["read"]
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use castellan_contracts::{
    capability::{CapabilitySet, PolicyRule, Role},
    claims::RoleName,
};

fn default_role_claim() -> String {
    "role".to_string()
}

/// Configuration for a single role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Human-readable explanation, for operators only.
    #[serde(default)]
    pub description: Option<String>,

    /// Extra names accepted in the login request's `role` field, e.g.
    /// `"admin-builds"`. The role's own name is always accepted.
    #[serde(default)]
    pub login_names: Vec<String>,

    /// Claims that must be present with exactly these string values for the
    /// role to resolve.
    #[serde(default)]
    pub bound_claims: BTreeMap<String, String>,

    /// Grants, in declaration order. Precedence is by pattern specificity,
    /// not by order.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

impl RoleConfig {
    /// Build the runtime `Role` for `name`.
    pub fn into_role(self, name: RoleName) -> Role {
        Role {
            name,
            login_names: self.login_names,
            bound_claims: self.bound_claims,
            capabilities: Arc::new(CapabilitySet::new(self.rules)),
        }
    }
}

/// The top-level structure deserialized from a TOML role file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// The claim that names the caller's role. Defaults to `"role"`.
    #[serde(default = "default_role_claim")]
    pub role_claim: String,

    /// Role name → configuration.
    #[serde(default)]
    pub roles: BTreeMap<String, RoleConfig>,
}
