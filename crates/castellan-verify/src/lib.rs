//! # castellan-verify
//!
//! Checks externally issued JWTs against a fixed set of trust anchors.
//!
//! [`JwtClaimVerifier`] implements
//! [`ClaimVerifier`](castellan_core::traits::ClaimVerifier). A token is
//! accepted only if its issuer is a configured anchor, its signature verifies
//! under one of that anchor's public keys with the anchor's algorithm, its
//! audience contains the anchor's audience, and `nbf <= now < exp`.
//!
//! ```rust,ignore
//! use castellan_verify::JwtClaimVerifier;
//!
//! let verifier = JwtClaimVerifier::from_file(Path::new("trust.toml"))?;
//! let claims = verifier.verify(&jwt, Utc::now())?;
//! ```

pub mod config;
pub mod engine;

pub use config::{TrustAnchorConfig, TrustConfig};
pub use engine::JwtClaimVerifier;

// ── Tests ─────────────────────────────────────────────────────────────────────
