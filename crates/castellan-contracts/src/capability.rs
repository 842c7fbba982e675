//! Path-scoped capability types.
//!
//! A role grants a `CapabilitySet`: an ordered list of `PolicyRule`s, each
//! pairing a `PathPattern` with the `OperationSet` it allows. Sessions hold
//! the capability set behind an `Arc` taken at issuance, so later role
//! reconfiguration never reaches an already-issued session.
//!
//! Precedence when several rules match one path: the most specific pattern
//! wins (longest literal prefix, then exact over glob, then fewer `+`
//! segments). Equally specific matches intersect their operation sets.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::claims::RoleName;
use crate::decision::AccessDecision;
use crate::error::DenyReason;

/// An operation a caller can request on a secret path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
    List,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Write,
        Operation::List,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::List => "list",
            Operation::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    fn bit(self) -> u8 {
        match self {
            Operation::Read => 0b0001,
            Operation::Write => 0b0010,
            Operation::List => 0b0100,
            Operation::Delete => 0b1000,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subset of {read, write, list, delete}.
///
/// Serialized as a list of operation names, e.g. `["read", "list"]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Operation>", into = "Vec<Operation>")]
pub struct OperationSet(u8);

impl OperationSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Operation::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, op: Operation) {
        self.0 |= op.bit();
    }

    pub fn contains(&self, op: Operation) -> bool {
        self.0 & op.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Operations present in both sets.
    pub fn intersection(&self, other: &OperationSet) -> OperationSet {
        Self(self.0 & other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Operation> + '_ {
        Operation::ALL.into_iter().filter(|op| self.contains(*op))
    }
}

impl FromIterator<Operation> for OperationSet {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        let mut set = OperationSet::empty();
        for op in iter {
            set.insert(op);
        }
        set
    }
}

impl From<Vec<Operation>> for OperationSet {
    fn from(ops: Vec<Operation>) -> Self {
        ops.into_iter().collect()
    }
}

impl From<OperationSet> for Vec<Operation> {
    fn from(set: OperationSet) -> Self {
        set.iter().collect()
    }
}

/// How specific a pattern is. Larger compares as more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    literal_prefix: usize,
    exact: bool,
    segment_wildcards: Reverse<usize>,
}

/// A secret-path pattern.
///
/// - `*` alone matches every path.
/// - A trailing `*` makes the pattern a prefix match: `kv/data/jobs/*`.
/// - A `+` segment matches exactly one non-empty path segment: `kv/data/+/config`.
/// - Anything else must match the path exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    raw: String,
}

impl PathPattern {
    /// Parse a pattern. `*` is only allowed as the final character.
    pub fn parse(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err("path pattern must not be empty".to_string());
        }
        if let Some(pos) = raw.find('*') {
            if pos != raw.len() - 1 {
                return Err(format!(
                    "path pattern '{raw}' may only use '*' as its final character"
                ));
            }
        }
        Ok(Self { raw })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn split_glob(&self) -> (&str, bool) {
        match self.raw.strip_suffix('*') {
            Some(body) => (body, true),
            None => (self.raw.as_str(), false),
        }
    }

    /// Return true if `path` is covered by this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let (body, glob) = self.split_glob();

        if !body.split('/').any(|seg| seg == "+") {
            return if glob { path.starts_with(body) } else { path == body };
        }

        let pattern_segs: Vec<&str> = body.split('/').collect();
        let path_segs: Vec<&str> = path.split('/').collect();

        if glob {
            if path_segs.len() < pattern_segs.len() {
                return false;
            }
        } else if path_segs.len() != pattern_segs.len() {
            return false;
        }

        let last = pattern_segs.len() - 1;
        pattern_segs
            .iter()
            .zip(path_segs.iter())
            .enumerate()
            .all(|(i, (pat, seg))| {
                if *pat == "+" {
                    !seg.is_empty()
                } else if glob && i == last {
                    // The glob continues the final segment.
                    seg.starts_with(pat)
                } else {
                    pat == seg
                }
            })
    }

    /// Rank used to pick the winning rule among several matches.
    pub fn specificity(&self) -> Specificity {
        let (body, glob) = self.split_glob();

        let mut literal_prefix = 0;
        let mut segment_wildcards = 0;
        let mut seen_wildcard = false;
        for (i, seg) in body.split('/').enumerate() {
            if seg == "+" {
                segment_wildcards += 1;
                seen_wildcard = true;
                continue;
            }
            if !seen_wildcard {
                // Account for the separator preceding every segment after the first.
                literal_prefix += seg.len() + usize::from(i > 0);
            }
        }

        Specificity {
            literal_prefix,
            exact: !glob,
            segment_wildcards: Reverse(segment_wildcards),
        }
    }
}

impl TryFrom<String> for PathPattern {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.raw
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One grant: the operations allowed on paths matching `path`.
///
/// An empty `operations` list is an explicit deny for everything the pattern
/// covers more specifically than any broader grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub path: PathPattern,
    pub operations: OperationSet,
}

impl PolicyRule {
    pub fn new(path: PathPattern, operations: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            path,
            operations: operations.into_iter().collect(),
        }
    }
}

/// The immutable grant a session is bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    rules: Vec<PolicyRule>,
}

impl CapabilitySet {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// The operations granted on `path` after precedence is applied, or
    /// `None` when no rule covers the path at all.
    pub fn effective_operations(&self, path: &str) -> Option<OperationSet> {
        let mut best: Option<(Specificity, OperationSet)> = None;

        for rule in self.rules.iter().filter(|r| r.path.matches(path)) {
            let spec = rule.path.specificity();
            best = match best {
                None => Some((spec, rule.operations)),
                Some((current, _)) if spec > current => Some((spec, rule.operations)),
                Some((current, ops)) if spec == current => {
                    Some((current, ops.intersection(&rule.operations)))
                }
                keep => keep,
            };
        }

        best.map(|(_, ops)| ops)
    }

    /// Decide whether `operation` on `path` is granted.
    pub fn evaluate(&self, path: &str, operation: Operation) -> AccessDecision {
        match self.effective_operations(path) {
            None => AccessDecision::Deny(DenyReason::PathNotGranted),
            Some(ops) if ops.contains(operation) => AccessDecision::Allow,
            Some(_) => AccessDecision::Deny(DenyReason::OperationNotGranted),
        }
    }
}

/// A configured role: its name, how it may be requested at login, the claim
/// values it is bound to, and what it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: RoleName,
    /// Names accepted in the login request's `role` field besides `name` itself.
    pub login_names: Vec<String>,
    /// Claims that must carry exactly these string values.
    pub bound_claims: BTreeMap<String, String>,
    pub capabilities: Arc<CapabilitySet>,
}

impl Role {
    pub fn new(name: RoleName, rules: Vec<PolicyRule>) -> Self {
        Self {
            name,
            login_names: Vec::new(),
            bound_claims: BTreeMap::new(),
            capabilities: Arc::new(CapabilitySet::new(rules)),
        }
    }

    /// Return true if a login request naming `requested` may resolve to this role.
    pub fn accepts_login_name(&self, requested: &str) -> bool {
        requested == self.name.as_str() || self.login_names.iter().any(|n| n == requested)
    }
}
