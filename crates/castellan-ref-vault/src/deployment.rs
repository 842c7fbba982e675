//! The reference secret-store deployment.
//!
//! One trusted issuer (the CI server at `http://localhost:8080`), audience
//! `vault`, three roles, five-minute sessions, and a hash-chained in-memory
//! audit trail. Time comes from a `ManualClock` so scenarios can walk a
//! credential through expiry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use castellan_audit::InMemoryAuditSink;
use castellan_contracts::error::BrokerResult;
use castellan_core::{traits::Clock, Broker, ManualClock};
use castellan_policy::TomlRoleResolver;
use castellan_session::{InMemorySessionStore, SessionConfig};
use castellan_verify::{JwtClaimVerifier, TrustAnchorConfig, TrustConfig};

pub const ISSUER: &str = "http://localhost:8080";
pub const AUDIENCE: &str = "vault";

/// Secret every role can read.
pub const JOB_SECRET_PATH: &str = "kv/data/jobs/test-job/db-password";
/// Job-scoped path the smoke test writes to.
pub const JOB_WRITE_PATH: &str = "kv/data/jobs/test-job/test-secret";
/// Only admin may touch this.
pub const ADMIN_SECRET_PATH: &str = "kv/data/admin/admin-secret";

const ROLES_TOML: &str = include_str!("../config/roles.toml");
const SESSION_TOML: &str = include_str!("../config/session.toml");
const ISSUER_PUBLIC_KEY: &str = include_str!("../keys/jenkins-oidc.pub");

/// Directory holding `roles.toml`, `trust.toml`, and `session.toml`.
pub fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

/// Trust configuration equivalent to `config/trust.toml`, with the key inlined.
pub fn bundled_trust() -> TrustConfig {
    TrustConfig {
        leeway_secs: 0,
        anchors: vec![
            TrustAnchorConfig::new(ISSUER, AUDIENCE, "RS256").with_public_key_pem(ISSUER_PUBLIC_KEY)
        ],
    }
}

pub struct VaultDeployment {
    pub broker: Broker,
    pub audit: Arc<InMemoryAuditSink>,
    pub sessions: Arc<InMemorySessionStore>,
    pub resolver: Arc<TomlRoleResolver>,
    pub clock: Arc<ManualClock>,
}

impl VaultDeployment {
    /// The deployment built from configuration compiled into this crate.
    pub fn bundled(start: DateTime<Utc>) -> BrokerResult<Self> {
        Self::assemble(
            JwtClaimVerifier::new(&bundled_trust())?,
            TomlRoleResolver::from_toml_str(ROLES_TOML)?,
            &SessionConfig::from_toml_str(SESSION_TOML)?,
            start,
        )
    }

    /// The deployment described by the three files in `dir`.
    pub fn from_config_dir(dir: &Path, start: DateTime<Utc>) -> BrokerResult<Self> {
        Self::assemble(
            JwtClaimVerifier::from_file(&dir.join("trust.toml"))?,
            TomlRoleResolver::from_file(&dir.join("roles.toml"))?,
            &SessionConfig::from_file(&dir.join("session.toml"))?,
            start,
        )
    }

    fn assemble(
        verifier: JwtClaimVerifier,
        resolver: TomlRoleResolver,
        session_config: &SessionConfig,
        start: DateTime<Utc>,
    ) -> BrokerResult<Self> {
        let audit = Arc::new(InMemoryAuditSink::new("vault-broker"));
        let sessions = Arc::new(InMemorySessionStore::from_config(session_config)?);
        let resolver = Arc::new(resolver);
        let clock = Arc::new(ManualClock::new(start));

        let broker = Broker::new(
            Box::new(verifier),
            Box::new(Arc::clone(&resolver)),
            Box::new(Arc::clone(&sessions)),
            Box::new(Arc::clone(&audit)),
        )
        .with_clock(Box::new(Arc::clone(&clock)));

        info!(ttl_secs = session_config.ttl_secs, "vault deployment assembled");

        Ok(Self {
            broker,
            audit,
            sessions,
            resolver,
            clock,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
