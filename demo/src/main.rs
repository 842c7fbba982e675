//! CASTELLAN Secret-Store Reference Deployment: Demo CLI
//!
//! Runs the role-authentication scenarios against a real broker wired from
//! the reference deployment's configuration.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- role readonly
//!   cargo run -p demo -- untrusted-issuer
//!   cargo run -p demo -- lifecycle
//!   cargo run -p demo -- check-config --dir crates/castellan-ref-vault/config

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use castellan_contracts::{
    claims::RoleName,
    error::{BrokerError, BrokerResult},
};
use castellan_ref_vault::{
    deployment::{config_dir, VaultDeployment},
    scenarios::{lifecycle, role_access, untrusted_issuer},
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// CASTELLAN: JWT role-authentication broker demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "CASTELLAN secret-store reference deployment demo",
    long_about = "Exchanges CI job tokens for scoped session credentials and shows\n\
                  per-role access, issuer rejection, revocation, and expiry."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Scenario 1 for a single role (admin, developer, readonly).
    Role {
        name: String,
    },
    /// Scenario 2: tokens from an unknown issuer or a foreign key.
    UntrustedIssuer,
    /// Scenario 3: revocation, expiry, and sweep.
    Lifecycle,
    /// Load roles.toml, trust.toml, and session.toml and print what they grant.
    CheckConfig {
        /// Directory holding the three files. Defaults to the bundled config.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::Role { name } => run_role(&name),
        Command::UntrustedIssuer => untrusted_issuer::run_scenario(),
        Command::Lifecycle => lifecycle::run_scenario(),
        Command::CheckConfig { dir } => check_config(dir.unwrap_or_else(config_dir)),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error [{}]: {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

fn run_all() -> BrokerResult<()> {
    role_access::run_scenario()?;
    untrusted_issuer::run_scenario()?;
    lifecycle::run_scenario()?;
    Ok(())
}

fn run_role(name: &str) -> BrokerResult<()> {
    let role = RoleName::parse(name).ok_or_else(|| BrokerError::ConfigError {
        reason: format!(
            "unknown role '{}'; expected one of: {}",
            name,
            RoleName::ALL.map(|r| r.as_str()).join(", ")
        ),
    })?;
    role_access::run_role(role).map(|_| ())
}

fn check_config(dir: PathBuf) -> BrokerResult<()> {
    info!(dir = %dir.display(), "checking configuration");

    let deployment = VaultDeployment::from_config_dir(&dir, Utc::now())?;

    println!("=== Configuration: {} ===", dir.display());
    println!();
    println!("  Session TTL:            {}s", deployment.sessions.ttl().num_seconds());
    for name in RoleName::ALL {
        match deployment.resolver.role(name) {
            Some(role) => {
                println!("  Role {}:", name);
                if !role.login_names.is_empty() {
                    println!("    login names:          {}", role.login_names.join(", "));
                }
                for (claim, value) in &role.bound_claims {
                    println!("    bound claim:          {} = {}", claim, value);
                }
                for rule in role.capabilities.rules() {
                    let ops: Vec<&str> = rule.operations.iter().map(|op| op.as_str()).collect();
                    println!("    {:<22} [{}]", rule.path.as_str(), ops.join(", "));
                }
            }
            None => println!("  Role {}:               (not configured)", name),
        }
    }
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("CASTELLAN: JWT Role-Authentication Broker");
    println!("Secret-Store Reference Demo");
    println!("==========================================");
    println!();
    println!("Login pipeline:");
    println!("  [1] Claim verifier checks issuer, signature, audience, nbf/exp");
    println!("  [2] Role resolver maps the role claim onto admin / developer / readonly");
    println!("  [3] Session issuer mints an opaque credential bound to that role's rules");
    println!("Every request:");
    println!("  [4] Access enforcer allows or denies (path, operation) with a specific reason");
    println!("  [5] One audit record per call, appended to a SHA-256 chain");
    println!();
}
