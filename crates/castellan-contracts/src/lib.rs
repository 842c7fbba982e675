//! # castellan-contracts
//!
//! Shared types, capability rules, and error contracts for the CASTELLAN
//! broker.
//!
//! All crates in the workspace import from here. Beyond plain data this crate
//! carries only the pure capability-matching rules, because they travel with
//! every issued session.

pub mod audit;
pub mod capability;
pub mod claims;
pub mod decision;
pub mod error;
pub mod login;
pub mod session;
