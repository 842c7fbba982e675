//! In-memory session registry.
//!
//! `InMemorySessionStore` maps credential accessors to `SessionRecord`s
//! behind an `RwLock`. Each trait method takes the lock for exactly one map
//! operation. A panic while the lock is held cannot leave a record half
//! written, so a poisoned lock is recovered rather than propagated.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use castellan_contracts::{
    capability::Role,
    error::{BrokerError, BrokerResult},
    session::{CredentialState, SessionCredential, SessionRecord},
};
use castellan_core::traits::SessionStore;

use crate::config::SessionConfig;
use crate::token;

pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &SessionConfig) -> BrokerResult<Self> {
        Ok(Self::new(config.ttl()?))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of records held, including revoked and expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::seconds(crate::config::DEFAULT_TTL_SECS as i64))
    }
}

impl SessionStore for InMemorySessionStore {
    fn issue(&self, role: &Role, now: DateTime<Utc>) -> BrokerResult<SessionCredential> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| BrokerError::IssuanceFailed {
                reason: format!(
                    "session expiry overflows: {} + {}s",
                    now,
                    self.ttl.num_seconds()
                ),
            })?;
        let token = token::generate_token()?;
        let accessor = token::accessor(&token);

        let record = SessionRecord {
            accessor: accessor.clone(),
            role: role.name,
            capabilities: Arc::clone(&role.capabilities),
            issued_at: now,
            expires_at,
            revoked_at: None,
        };
        self.write().insert(accessor.clone(), record);

        debug!(accessor = %accessor, role = %role.name, expires_at = %expires_at, "session issued");

        Ok(SessionCredential {
            token,
            accessor,
            role: role.name,
            issued_at: now,
            expires_at,
        })
    }

    fn lookup(&self, token: &str) -> Option<SessionRecord> {
        self.read().get(&token::accessor(token)).cloned()
    }

    fn revoke(&self, token: &str, now: DateTime<Utc>) -> bool {
        let accessor = token::accessor(token);
        let mut sessions = self.write();
        match sessions.get_mut(&accessor) {
            Some(record) if record.state_at(now) == CredentialState::Active => {
                record.revoked_at = Some(now);
                info!(accessor = %accessor, role = %record.role, "session revoked");
                true
            }
            _ => false,
        }
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, record| now < record.expires_at);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "expired sessions swept");
        }
        removed
    }

    fn accessor_for(&self, token: &str) -> String {
        token::accessor(token)
    }
}
