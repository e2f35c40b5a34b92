//! Remote collection stores.
//!
//! A remote store is a keyed collection with point writes and a live,
//! partition-filtered snapshot feed. Two implementations ship:
//! [`MemoryStore`] (in-process) and [`FirebaseStore`] (Firebase Realtime
//! Database over REST).

pub mod firebase;
pub mod memory;
mod sse;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::ShiftboardResult;
use crate::partition::PartitionKey;
use crate::record::{Collection, Fields, NewRecord, RecordId, StoredRecord};

/// Adapter over an external realtime document database.
///
/// Adapters never retry. Failures surface as `StoreUnavailable` (or
/// `NotFound` for updates to unknown ids) and the caller decides what to do.
pub trait RemoteStore: Send + Sync {
    /// Create a record and return its store-assigned id.
    fn put(
        &self,
        collection: &Collection,
        record: NewRecord,
    ) -> impl Future<Output = ShiftboardResult<RecordId>> + Send;

    /// Merge `patch` into an existing record.
    fn update(
        &self,
        collection: &Collection,
        id: &RecordId,
        patch: Fields,
    ) -> impl Future<Output = ShiftboardResult<()>> + Send;

    fn delete(
        &self,
        collection: &Collection,
        id: &RecordId,
    ) -> impl Future<Output = ShiftboardResult<()>> + Send;

    /// Delete every record in the partition. Empty partitions are a no-op.
    fn clear_partition(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
    ) -> impl Future<Output = ShiftboardResult<()>> + Send;

    /// Make `records` the entire content of the partition, keeping their ids.
    fn replace_partition(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
        records: Vec<StoredRecord>,
    ) -> impl Future<Output = ShiftboardResult<()>> + Send;

    /// Start a live feed of full-partition snapshots.
    ///
    /// The current state is delivered right away and again after every change
    /// to the partition, in the order the store observed the writes. When the
    /// feed cannot be established the sink receives [`Feed::Unavailable`].
    fn subscribe(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
        sink: SnapshotSink,
    ) -> Subscription;
}

/// What a subscription delivers.
#[derive(Debug, Clone)]
pub enum Feed {
    Snapshot(Vec<StoredRecord>),
    Unavailable(String),
}

/// A feed item tagged with the generation of the subscription that produced it.
#[derive(Debug)]
pub struct Delivery {
    pub generation: u64,
    pub feed: Feed,
}

/// Where a subscription pushes its feed.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    generation: u64,
    tx: mpsc::UnboundedSender<Delivery>,
}

impl SnapshotSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<Delivery>) -> Self {
        SnapshotSink { generation, tx }
    }

    /// Returns false once the receiving side is gone.
    pub fn snapshot(&self, records: Vec<StoredRecord>) -> bool {
        self.send(Feed::Snapshot(records))
    }

    pub fn unavailable(&self, reason: impl Into<String>) -> bool {
        self.send(Feed::Unavailable(reason.into()))
    }

    fn send(&self, feed: Feed) -> bool {
        self.tx
            .send(Delivery {
                generation: self.generation,
                feed,
            })
            .is_ok()
    }
}

/// Handle to a live feed. Cancelling is idempotent; dropping cancels.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn inert() -> Self {
        Subscription { cancel: None }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cancel_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.cancel();
        sub.cancel();
        drop(sub);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sink_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = SnapshotSink::new(7, tx);
        assert!(sink.snapshot(Vec::new()));
        drop(rx);
        assert!(!sink.unavailable("gone"));
    }
}
