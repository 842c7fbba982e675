//! # castellan-ref-vault
//!
//! Secret-store reference deployment for the CASTELLAN broker.
//!
//! Reproduces a CI role-authentication smoke test end to end: a job token
//! signed by the CI server's OIDC key is exchanged for a session, and the
//! session is checked against job-scoped and admin-only secret paths.
//!
//! 1. **Role Access Matrix**: admin, developer, and readonly each log in and
//!    try read/write on job and admin paths.
//! 2. **Untrusted Issuer**: tokens from an unknown issuer or signed with a
//!    foreign key never yield a session.
//! 3. **Credential Lifecycle**: revocation, expiry at issuance + TTL, and
//!    sweeping, driven by a manual clock.
//!
//! Keys under `keys/` are test fixtures generated for this crate only.

pub mod deployment;
pub mod scenarios;
pub mod tokens;

pub use deployment::VaultDeployment;
pub use tokens::{JobClaims, JobTokenIssuer};

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use castellan_contracts::{capability::Operation, claims::RoleName, login::LoginRequest};

    use crate::deployment::{config_dir, VaultDeployment, JOB_SECRET_PATH};
    use crate::tokens::JobTokenIssuer;

    /// The on-disk configuration and the bundled one describe the same
    /// deployment.
    #[test]
    fn test_config_dir_matches_bundled() {
        let from_files = VaultDeployment::from_config_dir(&config_dir(), Utc::now()).unwrap();
        let bundled = VaultDeployment::bundled(Utc::now()).unwrap();

        for role in RoleName::ALL {
            assert_eq!(from_files.resolver.role(role), bundled.resolver.role(role));
        }
        assert_eq!(from_files.sessions.ttl(), bundled.sessions.ttl());

        let issuer = JobTokenIssuer::jenkins().unwrap();
        let jwt = issuer.mint("readonly", "test-job", from_files.now()).unwrap();
        let response = from_files
            .broker
            .login(&LoginRequest::new("readonly-builds", jwt))
            .unwrap();
        assert!(from_files
            .broker
            .authorize(&response.auth.client_token, JOB_SECRET_PATH, Operation::Read)
            .is_allowed());
    }
}
