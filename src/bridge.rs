//! Asynchronous synchronization between the registry and the durable store.
//!
//! Mutations never wait on storage: `push` snapshots the registry onto a
//! bounded queue and returns, and one dedicated consumer task owns every
//! durable write. When the queue is full the snapshot is dropped and
//! reported, never blocking the caller. `pull` repopulates the registry
//! from the store at startup or for crash recovery.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::{Result, RoostError};
use crate::domain::FeedEntry;
use crate::registry::Registry;
use crate::store::{FeedRecord, Store};

pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// What became of a push request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    /// Queue at capacity: the snapshot was dropped and reported. The
    /// registry stays the source of truth until the next successful push.
    QueueFull,
}

struct PushJob {
    entries: Vec<FeedEntry>,
}

pub struct PersistenceBridge {
    tx: mpsc::Sender<PushJob>,
    consumer: JoinHandle<()>,
}

impl PersistenceBridge {
    /// Start the write-behind consumer. Must run inside a tokio runtime.
    pub fn spawn(store: Arc<dyn Store + Send + Sync>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<PushJob>(capacity);

        let consumer = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                write_snapshot(store.as_ref(), &job.entries);
            }
        });

        Self { tx, consumer }
    }

    /// Snapshot the registry and enqueue it for durable write.
    ///
    /// Never blocks on storage. Errors only on a poisoned registry lock or
    /// a closed queue; a full queue is an outcome, not an error.
    pub fn push(&self, registry: &Registry) -> Result<PushOutcome> {
        let entries = registry.snapshot()?;
        match self.tx.try_send(PushJob { entries }) {
            Ok(()) => Ok(PushOutcome::Enqueued),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("push queue full, dropping registry snapshot");
                Ok(PushOutcome::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(RoostError::Other("push queue closed".into()))
            }
        }
    }

    /// Stop accepting pushes and wait for queued snapshots to be written.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.consumer.await {
            tracing::error!("push consumer task failed: {}", e);
        }
    }
}

fn write_snapshot(store: &dyn Store, entries: &[FeedEntry]) {
    for entry in entries {
        if let Err(e) = store.write_feed(&FeedRecord::from(entry)) {
            // Reported, not propagated: the in-memory registry is not
            // rolled back on storage failure.
            tracing::error!("durable write failed for {}: {}", entry.url, e);
        }
    }
}

/// Restore every persisted feed into the registry.
///
/// Additive and overwriting, never deletive: entries in the registry but
/// absent from the store are left untouched. Returns how many records were
/// restored.
pub fn pull(store: &dyn Store, registry: &Registry) -> Result<usize> {
    let records = store.read_all()?;
    let count = records.len();
    for record in records {
        registry.restore(record.into_entry())?;
    }
    Ok(count)
}
