//! # castellan-core
//!
//! The role-authentication pipeline for CASTELLAN.
//!
//! This crate provides:
//! - The seam traits (`ClaimVerifier`, `RoleResolver`, `SessionStore`,
//!   `AuditSink`, `Clock`)
//! - The pure access enforcer
//! - The `Broker` that wires them together in the correct trust order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use castellan_core::{Broker, traits::{ClaimVerifier, RoleResolver, SessionStore, AuditSink}};
//! ```

pub mod broker;
pub mod clock;
pub mod enforcer;
pub mod traits;

pub use broker::Broker;
pub use clock::{ManualClock, SystemClock};
