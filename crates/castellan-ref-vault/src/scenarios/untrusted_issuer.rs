//! Scenario 2: Untrusted Issuer
//!
//! Two tokens that must never yield a session:
//!
//! Sub-case A: issuer `http://attacker.example:8080`, not a trust anchor
//!              → `UnknownIssuer`, rejected before any key is tried
//! Sub-case B: claims the trusted issuer but is signed with a foreign key
//!              → `InvalidSignature`
//!
//! Both tokens otherwise look exactly like a valid admin job token.

use chrono::Utc;

use castellan_contracts::{
    audit::{AuditAction, LoginOutcome},
    error::{BrokerError, BrokerResult},
    login::{LoginFailure, LoginRequest},
};

use crate::deployment::{VaultDeployment, ISSUER};
use crate::tokens::JobTokenIssuer;

pub const ATTACKER_ISSUER: &str = "http://attacker.example:8080";

#[derive(Debug)]
pub struct UntrustedReport {
    /// `None` means the broker accepted the token.
    pub foreign_issuer: Option<BrokerError>,
    pub forged_signature: Option<BrokerError>,
    pub sessions_issued: usize,
    pub failures_audited: usize,
}

pub fn attempt(deployment: &VaultDeployment) -> BrokerResult<UntrustedReport> {
    let now = deployment.now();

    let attacker = JobTokenIssuer::rogue(ATTACKER_ISSUER)?;
    let foreign_issuer = deployment
        .broker
        .login(&LoginRequest::new("admin-builds", attacker.mint("admin", "test-job", now)?))
        .err();

    let forger = JobTokenIssuer::rogue(ISSUER)?;
    let forged_signature = deployment
        .broker
        .login(&LoginRequest::new("admin-builds", forger.mint("admin", "test-job", now)?))
        .err();

    let failures_audited = deployment
        .audit
        .records()
        .iter()
        .filter(|r| {
            matches!(
                r.action,
                AuditAction::Login {
                    outcome: LoginOutcome::Failure { .. },
                    ..
                }
            )
        })
        .count();

    Ok(UntrustedReport {
        foreign_issuer,
        forged_signature,
        sessions_issued: deployment.sessions.len(),
        failures_audited,
    })
}

fn describe(outcome: &Option<BrokerError>) -> String {
    match outcome {
        Some(err) => {
            let failure = LoginFailure::from(err);
            format!("REJECTED [{}] {}", failure.kind, failure.message)
        }
        None => "ACCEPTED".to_string(),
    }
}

/// Run Scenario 2.
pub fn run_scenario() -> BrokerResult<()> {
    println!("=== Scenario 2: Untrusted Issuer ===");
    println!();

    let deployment = VaultDeployment::bundled(Utc::now())?;
    let report = attempt(&deployment)?;

    println!("  Sub-case A: iss = {ATTACKER_ISSUER}");
    println!("  Login:                  {}", describe(&report.foreign_issuer));
    println!();
    println!("  Sub-case B: iss = {ISSUER}, signed with an unknown key");
    println!("  Login:                  {}", describe(&report.forged_signature));
    println!();
    println!("  Sessions issued:        {}", report.sessions_issued);
    println!("  Failed logins audited:  {}", report.failures_audited);
    println!(
        "  Audit chain integrity:  {}",
        if deployment.audit.verify_integrity() { "VERIFIED" } else { "FAILED" }
    );
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
