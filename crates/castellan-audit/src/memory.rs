//! In-memory, hash-chained implementation of `AuditSink`.
//!
//! `InMemoryAuditSink` keeps every event in a `Vec` behind a `Mutex`. Use
//! `export_log()` to obtain a sealed `AuditLog` and `verify_integrity()` to
//! confirm the chain has not been altered in memory.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::debug;

use castellan_contracts::{
    audit::AuditRecord,
    error::{BrokerError, BrokerResult},
};
use castellan_core::traits::AuditSink;

use crate::{
    chain::{chain_hash, verify_chain},
    event::{AuditEvent, AuditLog},
};

pub(crate) struct InMemoryState {
    pub(crate) events: Vec<AuditEvent>,
    pub(crate) sequence: u64,
    pub(crate) last_hash: String,
}

/// An append-only audit sink backed by a SHA-256 hash chain.
pub struct InMemoryAuditSink {
    stream_id: String,
    pub(crate) state: Mutex<InMemoryState>,
}

impl InMemoryAuditSink {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            state: Mutex::new(InMemoryState {
                events: Vec::new(),
                sequence: 0,
                last_hash: AuditEvent::GENESIS_HASH.to_string(),
            }),
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// The records written so far, without chain metadata.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().events.iter().map(|e| e.record.clone()).collect()
    }

    /// A sealed copy of every event written so far.
    pub fn export_log(&self) -> AuditLog {
        let state = self.lock();
        AuditLog {
            stream_id: self.stream_id.clone(),
            events: state.events.clone(),
            exported_at: Utc::now(),
            terminal_hash: state
                .events
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
        }
    }

    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.lock().events)
    }

    // Every mutation completes before the guard drops, so the state behind a
    // poisoned lock is still a consistent chain.
    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditSink for InMemoryAuditSink {
    fn write(&self, record: &AuditRecord) -> BrokerResult<()> {
        // Serialization does not depend on the chain, so it stays outside the lock.
        let record_json = serde_json::to_vec(record).map_err(|e| BrokerError::AuditWriteFailed {
            reason: format!("failed to serialize audit record: {}", e),
        })?;
        let record = record.clone();
        let stream_id = self.stream_id.clone();

        let mut state = self.lock();

        let sequence = state.sequence;
        let this_hash = chain_hash(&stream_id, sequence, &state.last_hash, &record_json);

        let event = AuditEvent {
            sequence,
            stream_id,
            record,
            prev_hash: std::mem::replace(&mut state.last_hash, this_hash.clone()),
            this_hash,
        };
        state.events.push(event);
        state.sequence += 1;

        debug!(stream_id = %self.stream_id, sequence, "audit event appended");
        Ok(())
    }
}
