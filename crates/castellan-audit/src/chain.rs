//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. stream_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of record (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use castellan_contracts::audit::AuditRecord;

use crate::event::AuditEvent;

/// Compute the SHA-256 hash for a single audit event.
///
/// Returns a lowercase 64-character hex string, or the serialization error
/// if `record` cannot be rendered as JSON.
pub fn hash_event(
    stream_id: &str,
    sequence: u64,
    record: &AuditRecord,
    prev_hash: &str,
) -> Result<String, serde_json::Error> {
    let record_json = serde_json::to_vec(record)?;
    Ok(chain_hash(stream_id, sequence, prev_hash, &record_json))
}

/// Hash an event whose record is already serialized.
///
/// `record_json` must be `serde_json::to_vec` of the record, or the result
/// will not match `hash_event`.
pub fn chain_hash(stream_id: &str, sequence: u64, prev_hash: &str, record_json: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stream_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(record_json);

    hex::encode(hasher.finalize())
}

/// Verify the integrity of a hash chain.
///
/// Valid when every event's `prev_hash` equals the previous `this_hash` (or
/// `GENESIS_HASH` for event 0), every `this_hash` matches the value
/// recomputed from the event's fields, and sequences run 0, 1, 2, ... An
/// empty chain is valid.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    let mut expected_prev = AuditEvent::GENESIS_HASH;

    for (idx, event) in events.iter().enumerate() {
        if event.sequence != idx as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_event(&event.stream_id, event.sequence, &event.record, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = &event.this_hash;
    }

    true
}
