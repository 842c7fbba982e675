//! Verified token claims and the closed role vocabulary.
//!
//! A `ClaimSet` only exists after the claim verifier has checked a token's
//! signature, issuer, audience, and time bounds. `RoleName` is the closed set
//! of roles the broker knows about; claim values are mapped onto it through an
//! allow-list and never passed through as free text.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `aud` claim, which RFC 7519 allows to be a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    /// Return true if `audience` is (one of) the token's audience values.
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(a) => a == audience,
            Audience::Many(all) => all.iter().any(|a| a == audience),
        }
    }
}

/// The claims extracted from a verified JWT.
///
/// Registered time claims are unix seconds. Every claim the broker does not
/// model explicitly (`role`, `env`, `jenkins_job`, ...) lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Issuer (`iss`).
    pub iss: String,
    /// Audience (`aud`).
    pub aud: Audience,
    /// Subject (`sub`), if the issuer sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued-at (`iat`).
    pub iat: i64,
    /// Not-before (`nbf`).
    pub nbf: i64,
    /// Expiry (`exp`).
    pub exp: i64,
    /// All remaining claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClaimSet {
    /// Look up a non-registered claim and return it if it is a JSON string.
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(Value::as_str)
    }

    /// `iat` as a UTC timestamp.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    /// `exp` as a UTC timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Issuer and subject as a token states them, whether or not it verified.
///
/// Only ever used to label audit records of failed logins. Nothing here may
/// feed an authorization decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedIdentity {
    pub issuer: Option<String>,
    pub subject: Option<String>,
}

impl From<&ClaimSet> for ClaimedIdentity {
    fn from(claims: &ClaimSet) -> Self {
        Self {
            issuer: Some(claims.iss.clone()),
            subject: claims.sub.clone(),
        }
    }
}

/// The closed set of roles a session can be issued for.
///
/// Configuration attaches policy rules to these names; a claim value that does
/// not parse into one of them can never yield a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    /// Full access to every path.
    Admin,
    /// Read/write on job-scoped secrets.
    Developer,
    /// Read-only on job-scoped secrets.
    Readonly,
}

impl RoleName {
    /// Every role, in declaration order.
    pub const ALL: [RoleName; 3] = [RoleName::Admin, RoleName::Developer, RoleName::Readonly];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::Developer => "developer",
            RoleName::Readonly => "readonly",
        }
    }

    /// Allow-list lookup. Matching is exact and case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
