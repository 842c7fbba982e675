//! Wire shapes for the login exchange.
//!
//! These mirror a `POST /login {role, jwt} -> {auth: {client_token, ...}}`
//! endpoint. Transport is left to the hosting application; the broker only
//! consumes and produces these values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BrokerError;
use crate::session::SessionCredential;

/// A login attempt: the role the caller asks for plus its bearer JWT.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub role: String,
    pub jwt: String,
}

impl LoginRequest {
    pub fn new(role: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            jwt: jwt.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("role", &self.role)
            .field("jwt", &"<redacted>")
            .finish()
    }
}

/// Successful login body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub auth: AuthInfo,
}

/// The issued session as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthInfo {
    pub client_token: String,
    pub accessor: String,
    /// Names of the policies bound to the session.
    pub policies: Vec<String>,
    /// Seconds until the session expires.
    pub lease_duration: u64,
    /// Sessions are never renewable; callers log in again.
    pub renewable: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AuthInfo {
    pub fn from_credential(
        credential: &SessionCredential,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client_token: credential.token.clone(),
            accessor: credential.accessor.clone(),
            policies: vec![credential.role.as_str().to_string()],
            lease_duration: credential.ttl_secs(),
            renewable: false,
            metadata,
        }
    }
}

/// Failed login body: a machine-readable kind plus a human message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFailure {
    pub kind: String,
    pub message: String,
}

impl From<&BrokerError> for LoginFailure {
    fn from(err: &BrokerError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
