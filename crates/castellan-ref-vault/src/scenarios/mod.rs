//! Secret-store reference scenarios.
//!
//! Each scenario drives a real `VaultDeployment` (claim verifier, role
//! resolver, session registry, audit chain) with tokens minted by
//! `JobTokenIssuer`, and returns a report so tests can assert on it.

pub mod lifecycle;
pub mod role_access;
pub mod untrusted_issuer;
