//! Audit event and log types.
//!
//! `AuditEvent` is a single entry in the hash chain. It wraps an
//! `AuditRecord` with sequence numbering and the SHA-256 hashes that make
//! tampering detectable. `AuditLog` is a sealed snapshot of a whole stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use castellan_contracts::audit::AuditRecord;

/// A single entry in the SHA-256 hash chain of one audit stream.
///
/// Each event commits to the previous event via `prev_hash`. Modifying any
/// field, including those of the embedded `record`, invalidates `this_hash`
/// and every later `prev_hash`, which `verify_chain` detects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    /// The stream (usually one per broker instance) this event belongs to.
    pub stream_id: String,

    /// The record emitted by the broker.
    pub record: AuditRecord,

    /// `this_hash` of the previous event, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// SHA-256 (hex) over (stream_id, sequence, prev_hash, canonical JSON of
    /// record).
    pub this_hash: String,
}

impl AuditEvent {
    /// The `prev_hash` of the first event in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A sealed snapshot of an audit stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub stream_id: String,

    /// All events in chain order (sequence 0 first).
    pub events: Vec<AuditEvent>,

    /// When the snapshot was taken.
    pub exported_at: DateTime<Utc>,

    /// `this_hash` of the last event; empty if the log is empty.
    pub terminal_hash: String,
}
