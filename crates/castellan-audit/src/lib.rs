//! # castellan-audit
//!
//! Audit sinks for the CASTELLAN broker.
//!
//! ## Overview
//!
//! - [`InMemoryAuditSink`] wraps every record in an [`AuditEvent`] linked to
//!   the previous event by its SHA-256 hash. Altering any event breaks the
//!   chain and is detected by [`verify_chain`].
//! - [`ChannelAuditSink`] forwards records over a bounded channel to a
//!   consumer thread and drops them, never blocks, when the consumer lags.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use castellan_audit::InMemoryAuditSink;
//!
//! let audit = Arc::new(InMemoryAuditSink::new("vault-broker"));
//! let broker = Broker::new(verifier, resolver, sessions, Box::new(Arc::clone(&audit)));
//! // ...
//! assert!(audit.verify_integrity());
//! let log = audit.export_log();
//! ```

pub mod chain;
pub mod channel;
pub mod event;
pub mod memory;

pub use chain::{chain_hash, hash_event, verify_chain};
pub use channel::ChannelAuditSink;
pub use event::{AuditEvent, AuditLog};
pub use memory::InMemoryAuditSink;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use castellan_contracts::{
        audit::{AuditAction, AuditRecord},
        capability::Operation,
        decision::AccessDecision,
        error::{BrokerError, DenyReason},
    };
    use castellan_core::traits::AuditSink;

    use super::{AuditEvent, ChannelAuditSink, InMemoryAuditSink};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn authorize_record(path: &str, decision: AccessDecision) -> AuditRecord {
        AuditRecord::new(
            at(0),
            AuditAction::Authorize {
                accessor: Some("ab12".to_string()),
                path: path.to_string(),
                operation: Operation::Read,
                decision,
            },
        )
    }

    fn write_three(sink: &InMemoryAuditSink) {
        sink.write(&authorize_record("kv/data/jobs/a", AccessDecision::Allow)).unwrap();
        sink.write(&authorize_record(
            "kv/data/admin/x",
            AccessDecision::Deny(DenyReason::PathNotGranted),
        ))
        .unwrap();
        sink.write(&AuditRecord::new(at(5), AuditAction::Sweep { removed: 2 })).unwrap();
    }

    // ── 1. hash chain ─────────────────────────────────────────────────────────

    #[test]
    fn test_hash_chain_integrity() {
        let sink = InMemoryAuditSink::new("stream-integrity");
        write_three(&sink);
        assert_eq!(sink.len(), 3);
        assert!(sink.verify_integrity(), "chain must be valid after sequential writes");
    }

    /// Turning a recorded deny into an allow breaks the chain.
    #[test]
    fn test_tamper_detection() {
        let sink = InMemoryAuditSink::new("stream-tamper");
        write_three(&sink);

        {
            let mut state = sink.state.lock().unwrap();
            if let AuditAction::Authorize { decision, .. } = &mut state.events[1].record.action {
                *decision = AccessDecision::Allow;
            }
        }

        assert!(!sink.verify_integrity(), "chain must detect tampering with a stored event");
    }

    #[test]
    fn test_dropped_event_detected() {
        let sink = InMemoryAuditSink::new("stream-gap");
        write_three(&sink);
        let mut log = sink.export_log();
        log.events.remove(1);
        assert!(!super::verify_chain(&log.events));
    }

    #[test]
    fn test_genesis_hash() {
        let sink = InMemoryAuditSink::new("stream-genesis");
        sink.write(&authorize_record("kv/a", AccessDecision::Allow)).unwrap();

        let log = sink.export_log();
        assert_eq!(log.events[0].prev_hash, AuditEvent::GENESIS_HASH);
    }

    #[test]
    fn test_sequence_monotonic() {
        let sink = InMemoryAuditSink::new("stream-seq");
        write_three(&sink);

        for (idx, event) in sink.export_log().events.iter().enumerate() {
            assert_eq!(event.sequence, idx as u64);
            assert_eq!(event.stream_id, "stream-seq");
        }
    }

    #[test]
    fn test_export_log() {
        let sink = InMemoryAuditSink::new("stream-export");
        write_three(&sink);

        let log = sink.export_log();
        assert_eq!(log.stream_id, "stream-export");
        assert_eq!(log.events.len(), 3);
        assert_eq!(log.terminal_hash, log.events.last().unwrap().this_hash);
        assert!(super::verify_chain(&log.events));

        let records = sink.records();
        assert_eq!(records[2].action, AuditAction::Sweep { removed: 2 });
    }

    #[test]
    fn test_verify_empty() {
        let sink = InMemoryAuditSink::new("stream-empty");
        assert!(sink.is_empty());
        assert!(sink.verify_integrity());
        assert!(super::verify_chain(&[]));
        assert_eq!(sink.export_log().terminal_hash, "");
    }

    /// Same content in a different stream hashes differently.
    #[test]
    fn test_stream_id_is_committed() {
        let record = authorize_record("kv/a", AccessDecision::Allow);
        let a = super::hash_event("a", 0, &record, AuditEvent::GENESIS_HASH).unwrap();
        let b = super::hash_event("b", 0, &record, AuditEvent::GENESIS_HASH).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    /// Hashing pre-serialized JSON agrees with hashing the record, so the
    /// sink can serialize before it takes the lock.
    #[test]
    fn test_chain_hash_matches_hash_event() {
        let record = authorize_record("kv/a", AccessDecision::Allow);
        let json = serde_json::to_vec(&record).unwrap();
        assert_eq!(
            super::chain_hash("s", 3, AuditEvent::GENESIS_HASH, &json),
            super::hash_event("s", 3, &record, AuditEvent::GENESIS_HASH).unwrap()
        );

        let sink = InMemoryAuditSink::new("s");
        sink.write(&record).unwrap();
        let log = sink.export_log();
        assert_eq!(
            log.events[0].this_hash,
            super::chain_hash("s", 0, AuditEvent::GENESIS_HASH, &json)
        );
    }

    #[test]
    fn test_concurrent_writes_keep_chain_valid() {
        let sink = InMemoryAuditSink::new("stream-threads");
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..25 {
                        sink.write(&authorize_record("kv/a", AccessDecision::Allow)).unwrap();
                    }
                });
            }
        });
        assert_eq!(sink.len(), 100);
        assert!(sink.verify_integrity());
    }

    // ── 2. channel sink ───────────────────────────────────────────────────────

    #[test]
    fn test_channel_delivers_in_order() {
        let (sink, rx) = ChannelAuditSink::bounded(4);
        let first = authorize_record("kv/a", AccessDecision::Allow);
        let second = AuditRecord::new(at(1), AuditAction::Sweep { removed: 0 });

        sink.write(&first).unwrap();
        sink.write(&second).unwrap();

        assert_eq!(rx.recv().unwrap(), first);
        assert_eq!(rx.recv().unwrap(), second);
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_channel_full_drops_without_blocking() {
        let (sink, rx) = ChannelAuditSink::bounded(1);
        sink.write(&authorize_record("kv/a", AccessDecision::Allow)).unwrap();

        assert!(matches!(
            sink.write(&authorize_record("kv/b", AccessDecision::Allow)),
            Err(BrokerError::AuditWriteFailed { .. })
        ));
        assert_eq!(sink.dropped(), 1);

        // Draining frees the slot again.
        rx.recv().unwrap();
        assert!(sink.write(&authorize_record("kv/c", AccessDecision::Allow)).is_ok());
    }

    #[test]
    fn test_channel_disconnected_consumer() {
        let (sink, rx) = ChannelAuditSink::bounded(1);
        drop(rx);
        assert!(matches!(
            sink.write(&authorize_record("kv/a", AccessDecision::Allow)),
            Err(BrokerError::AuditWriteFailed { .. })
        ));
        assert_eq!(sink.dropped(), 1);
    }
}
