//! The per-request authorization outcome.

use serde::{Deserialize, Serialize};

use crate::error::DenyReason;

/// Result of checking one (credential, path, operation) request.
///
/// Never stored; recomputed for every request. A denial always carries the
/// specific reason so callers can tell an expired credential from a path the
/// role was never granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    /// The deny reason, or `None` for `Allow`.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Deny(reason) => Some(*reason),
        }
    }
}
