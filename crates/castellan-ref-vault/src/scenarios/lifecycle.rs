//! Scenario 3: Credential Lifecycle
//!
//! Two developer sessions issued at the same instant, then:
//!
//! 1. session A is revoked; it is denied with `CredentialRevoked` from then on
//! 2. at issuance + TTL - 1s session B is still allowed
//! 3. at issuance + TTL session B is denied with `CredentialExpired`, and A
//!    still reports `CredentialRevoked`
//! 4. a sweep reclaims both; afterwards they are `CredentialUnknown`
//!
//! The job token itself stays valid for ten minutes throughout. Session
//! lifetime does not depend on it.

use chrono::{Duration, Utc};

use castellan_contracts::{
    capability::Operation,
    decision::AccessDecision,
    error::BrokerResult,
    login::LoginRequest,
};

use crate::deployment::{VaultDeployment, JOB_SECRET_PATH};
use crate::tokens::JobTokenIssuer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
    pub ttl_secs: u64,
    pub a_before_revoke: AccessDecision,
    pub a_after_revoke: AccessDecision,
    pub revoked_again: bool,
    pub b_before_expiry: AccessDecision,
    pub b_at_expiry: AccessDecision,
    pub a_at_expiry: AccessDecision,
    pub swept: usize,
    pub b_after_sweep: AccessDecision,
}

pub fn walk(deployment: &VaultDeployment, issuer: &JobTokenIssuer) -> BrokerResult<LifecycleReport> {
    let broker = &deployment.broker;
    let login = || -> BrokerResult<String> {
        let jwt = issuer.mint("developer", "test-job", deployment.now())?;
        let response = broker.login(&LoginRequest::new("developer-builds", jwt))?;
        Ok(response.auth.client_token)
    };

    let a = login()?;
    let b = login()?;
    let ttl = deployment.sessions.ttl();
    let read = |token: &str| broker.authorize(token, JOB_SECRET_PATH, Operation::Read);

    let a_before_revoke = read(&a);
    broker.revoke(&a);
    let a_after_revoke = read(&a);
    let revoked_again = broker.revoke(&a);

    deployment.clock.advance(ttl - Duration::seconds(1));
    let b_before_expiry = read(&b);

    deployment.clock.advance(Duration::seconds(1));
    let b_at_expiry = read(&b);
    let a_at_expiry = read(&a);

    let swept = broker.sweep();
    let b_after_sweep = read(&b);

    Ok(LifecycleReport {
        ttl_secs: ttl.num_seconds().max(0) as u64,
        a_before_revoke,
        a_after_revoke,
        revoked_again,
        b_before_expiry,
        b_at_expiry,
        a_at_expiry,
        swept,
        b_after_sweep,
    })
}

/// Run Scenario 3.
pub fn run_scenario() -> BrokerResult<()> {
    println!("=== Scenario 3: Credential Lifecycle ===");
    println!();

    let deployment = VaultDeployment::bundled(Utc::now())?;
    let issuer = JobTokenIssuer::jenkins()?;
    let report = walk(&deployment, &issuer)?;

    println!("  Session TTL:            {}s", report.ttl_secs);
    println!("  A before revoke:        {:?}", report.a_before_revoke);
    println!("  A after revoke:         {:?}", report.a_after_revoke);
    println!("  A revoked twice:        {}", report.revoked_again);
    println!("  B at TTL - 1s:          {:?}", report.b_before_expiry);
    println!("  B at TTL:               {:?}", report.b_at_expiry);
    println!("  A at TTL:               {:?}", report.a_at_expiry);
    println!("  Sessions swept:         {}", report.swept);
    println!("  B after sweep:          {:?}", report.b_after_sweep);
    println!(
        "  Audit chain integrity:  {}",
        if deployment.audit.verify_integrity() { "VERIFIED" } else { "FAILED" }
    );
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
