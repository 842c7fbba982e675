//! Bounded channel audit sink.
//!
//! `ChannelAuditSink` hands records to a consumer thread through a bounded
//! `std::sync::mpsc::sync_channel`. `write` never blocks: when the buffer is
//! full the record is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};

use tracing::warn;

use castellan_contracts::{
    audit::AuditRecord,
    error::{BrokerError, BrokerResult},
};
use castellan_core::traits::AuditSink;

pub struct ChannelAuditSink {
    sender: SyncSender<AuditRecord>,
    dropped: AtomicU64,
}

impl ChannelAuditSink {
    /// A sink buffering up to `capacity` records, and the receiving end.
    pub fn bounded(capacity: usize) -> (Self, Receiver<AuditRecord>) {
        let (sender, receiver) = sync_channel(capacity);
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Records discarded because the buffer was full or the receiver gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl AuditSink for ChannelAuditSink {
    fn write(&self, record: &AuditRecord) -> BrokerResult<()> {
        match self.sender.try_send(record.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(record)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(audit_id = %record.id.0, dropped, "audit channel full; record dropped");
                Err(BrokerError::AuditWriteFailed {
                    reason: "audit channel is full".to_string(),
                })
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(BrokerError::AuditWriteFailed {
                    reason: "audit consumer has disconnected".to_string(),
                })
            }
        }
    }
}
