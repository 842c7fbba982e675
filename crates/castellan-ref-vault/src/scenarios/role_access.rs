//! Scenario 1: Role Access Matrix
//!
//! A CI job logs in once per role with a token whose `role` claim names that
//! role, then tries three things with the returned credential:
//!
//! - read  `kv/data/jobs/test-job/db-password`
//! - write `kv/data/jobs/test-job/test-secret`
//! - read  `kv/data/admin/admin-secret`
//!
//! Expected:
//!
//! | role      | read job | write job | read admin |
//! |-----------|----------|-----------|------------|
//! | admin     | Allow    | Allow     | Allow      |
//! | developer | Allow    | Allow     | Deny       |
//! | readonly  | Allow    | Deny      | Deny       |

use chrono::Utc;

use castellan_contracts::{
    capability::Operation,
    claims::RoleName,
    decision::AccessDecision,
    error::BrokerResult,
    login::LoginRequest,
};

use crate::deployment::{VaultDeployment, ADMIN_SECRET_PATH, JOB_SECRET_PATH, JOB_WRITE_PATH};
use crate::tokens::JobTokenIssuer;

/// What one role's credential was allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessReport {
    pub role: RoleName,
    pub accessor: String,
    pub lease_duration: u64,
    pub read_job: AccessDecision,
    pub write_job: AccessDecision,
    pub read_admin: AccessDecision,
    pub write_admin: AccessDecision,
}

/// Log in as `role` through its `<role>-builds` login name and check the
/// smoke-test paths.
pub fn exercise_role(
    deployment: &VaultDeployment,
    issuer: &JobTokenIssuer,
    role: RoleName,
) -> BrokerResult<AccessReport> {
    let jwt = issuer.mint(role.as_str(), "test-job", deployment.now())?;
    let response = deployment
        .broker
        .login(&LoginRequest::new(format!("{role}-builds"), jwt))?;
    let token = &response.auth.client_token;
    let broker = &deployment.broker;

    Ok(AccessReport {
        role,
        accessor: response.auth.accessor.clone(),
        lease_duration: response.auth.lease_duration,
        read_job: broker.authorize(token, JOB_SECRET_PATH, Operation::Read),
        write_job: broker.authorize(token, JOB_WRITE_PATH, Operation::Write),
        read_admin: broker.authorize(token, ADMIN_SECRET_PATH, Operation::Read),
        write_admin: broker.authorize(token, ADMIN_SECRET_PATH, Operation::Write),
    })
}

fn describe(decision: &AccessDecision) -> String {
    match decision {
        AccessDecision::Allow => "ALLOW".to_string(),
        AccessDecision::Deny(reason) => format!("DENY ({reason})"),
    }
}

fn print_report(report: &AccessReport) {
    println!("  Role:                   {}", report.role);
    println!("  Session accessor:       {}", report.accessor);
    println!("  Lease duration:         {}s", report.lease_duration);
    println!("  read  {JOB_SECRET_PATH}:  {}", describe(&report.read_job));
    println!("  write {JOB_WRITE_PATH}:   {}", describe(&report.write_job));
    println!("  read  {ADMIN_SECRET_PATH}:         {}", describe(&report.read_admin));
    println!("  write {ADMIN_SECRET_PATH}:         {}", describe(&report.write_admin));
}

/// Run the matrix for a single role against a fresh deployment.
pub fn run_role(role: RoleName) -> BrokerResult<AccessReport> {
    println!("=== Scenario 1: Role Access ({role}) ===");
    println!();

    let deployment = VaultDeployment::bundled(Utc::now())?;
    let issuer = JobTokenIssuer::jenkins()?;
    let report = exercise_role(&deployment, &issuer, role)?;
    print_report(&report);

    let log = deployment.audit.export_log();
    println!(
        "  Audit chain integrity:  {} ({} event(s))",
        if deployment.audit.verify_integrity() { "VERIFIED" } else { "FAILED" },
        log.events.len()
    );
    println!();

    Ok(report)
}

/// Run Scenario 1 for admin, developer, and readonly in one deployment.
pub fn run_scenario() -> BrokerResult<()> {
    println!("=== Scenario 1: Role Access Matrix ===");
    println!();

    let deployment = VaultDeployment::bundled(Utc::now())?;
    let issuer = JobTokenIssuer::jenkins()?;

    for role in RoleName::ALL {
        let report = exercise_role(&deployment, &issuer, role)?;
        print_report(&report);
        println!();
    }

    let log = deployment.audit.export_log();
    println!(
        "  Audit chain integrity:  {} ({} event(s), terminal hash {})",
        if deployment.audit.verify_integrity() { "VERIFIED" } else { "FAILED" },
        log.events.len(),
        log.terminal_hash
    );
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
