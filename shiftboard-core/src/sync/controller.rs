use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;

use super::Mode;
use crate::cache::LocalCache;
use crate::error::{ShiftboardError, ShiftboardResult};
use crate::partition::PartitionKey;
use crate::record::{
    Collection, Mutable, NewRecord, Payload, Record, RecordId, StoredRecord, compare,
};
use crate::remote::{Delivery, Feed, RemoteStore, SnapshotSink, Subscription};

/// Why the presentation layer is being asked to re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The active partition changed and the mirror was emptied.
    Reset,
    /// The mirror was loaded from the local cache (local mode).
    Loaded,
    /// A local-mode mutation was applied.
    Local,
    /// A remote snapshot replaced the mirror.
    Snapshot,
    /// The live feed failed; the mirror shows the last cached state.
    CacheFallback,
}

/// Read-only view handed to listeners.
pub struct View<'a, P> {
    pub partition: &'a PartitionKey,
    pub records: &'a [Record<P>],
    pub origin: Origin,
}

type Listener<P> = Box<dyn FnMut(&View<'_, P>) + Send>;

/// Owns the in-memory mirror of one active partition.
///
/// In remote mode mutations go straight to the store and the mirror only
/// changes when the resulting snapshot arrives. In local mode mutations are
/// persisted to the cache first and applied only once that succeeded.
///
/// Every subscription is tagged with a generation; feeds from an older
/// generation are discarded, so a late snapshot for a previous partition can
/// never touch the current mirror.
pub struct SyncController<P: Payload, R: RemoteStore> {
    collection: Collection,
    cache: LocalCache,
    remote: Option<R>,
    partition: Option<PartitionKey>,
    mirror: HashMap<RecordId, Record<P>>,
    ordered: Vec<Record<P>>,
    generation: u64,
    subscription: Option<Subscription>,
    tx: mpsc::UnboundedSender<Delivery>,
    rx: mpsc::UnboundedReceiver<Delivery>,
    ready: bool,
    degraded: bool,
    last_created_at: i64,
    listeners: Vec<Listener<P>>,
}

impl<P: Payload, R: RemoteStore> SyncController<P, R> {
    /// Bind a controller to one mode: remote when a store is given, local otherwise.
    pub fn open(collection: Collection, cache: LocalCache, remote: Option<R>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = SyncController {
            collection,
            cache,
            remote,
            partition: None,
            mirror: HashMap::new(),
            ordered: Vec::new(),
            generation: 0,
            subscription: None,
            tx,
            rx,
            ready: false,
            degraded: false,
            last_created_at: 0,
            listeners: Vec::new(),
        };
        tracing::info!(
            collection = %controller.collection.name,
            kind = ?P::KIND,
            mode = ?controller.mode(),
            "sync controller opened"
        );
        controller
    }

    pub fn mode(&self) -> Mode {
        if self.remote.is_some() {
            Mode::Remote
        } else {
            Mode::Local
        }
    }

    /// Records of the active partition in display order.
    pub fn records(&self) -> &[Record<P>] {
        &self.ordered
    }

    #[cfg(test)]
    pub(crate) fn partition(&self) -> Option<&PartitionKey> {
        self.partition.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, id: &RecordId) -> Option<&Record<P>> {
        self.mirror.get(id)
    }

    /// True while the mirror shows cached data because the live feed failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn on_change(&mut self, listener: impl FnMut(&View<'_, P>) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Make `partition` the active one.
    pub fn activate(&mut self, partition: PartitionKey) {
        if let Some(current) = self.partition.clone() {
            // Never overwrite the cache with a mirror that isn't real data yet.
            if self.ready && !self.degraded {
                self.persist_quietly(&current);
            }
        }

        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }

        self.generation += 1;
        self.mirror.clear();
        self.ordered.clear();
        self.ready = false;
        self.degraded = false;
        self.partition = Some(partition.clone());
        tracing::debug!(
            collection = %self.collection.name,
            %partition,
            generation = self.generation,
            "activating partition"
        );
        self.notify(Origin::Reset);

        match &self.remote {
            Some(remote) => {
                let sink = SnapshotSink::new(self.generation, self.tx.clone());
                self.subscription = Some(remote.subscribe(&self.collection, &partition, sink));
            }
            None => {
                let stored = self.cache.load(&self.collection.name, &partition);
                self.replace_mirror(stored);
                self.ready = true;
                self.notify(Origin::Loaded);
            }
        }
    }

    /// Apply every feed item already queued, without waiting.
    /// Returns how many were applied (stale items are not counted).
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(delivery) = self.rx.try_recv() {
            if self.apply(delivery) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next feed item and apply it. In local mode nothing is
    /// ever queued, so this only returns once a remote feed delivers.
    pub async fn next_feed(&mut self) -> bool {
        match self.rx.recv().await {
            Some(delivery) => self.apply(delivery),
            None => false,
        }
    }

    /// Wait until the active partition has data (or a cache fallback).
    pub async fn settle(&mut self) {
        if self.partition.is_none() {
            return;
        }
        while !self.ready {
            self.next_feed().await;
        }
    }

    fn apply(&mut self, delivery: Delivery) -> bool {
        if delivery.generation != self.generation {
            tracing::debug!(
                collection = %self.collection.name,
                stale = delivery.generation,
                current = self.generation,
                "discarding feed from a previous subscription"
            );
            return false;
        }
        let Some(partition) = self.partition.clone() else {
            return false;
        };

        match delivery.feed {
            Feed::Snapshot(stored) => {
                self.replace_mirror(stored);
                self.ready = true;
                self.degraded = false;
                self.persist_quietly(&partition);
                self.notify(Origin::Snapshot);
            }
            Feed::Unavailable(reason) => {
                tracing::warn!(
                    collection = %self.collection.name,
                    %partition,
                    "live feed unavailable, showing cached state: {reason}"
                );
                let stored = self.cache.load(&self.collection.name, &partition);
                self.replace_mirror(stored);
                self.ready = true;
                self.degraded = true;
                self.notify(Origin::CacheFallback);
            }
        }
        true
    }

    /// Create a record in the active partition.
    pub async fn add(&mut self, payload: P) -> ShiftboardResult<RecordId> {
        payload.validate()?;
        let partition = self.active_partition()?;
        let created_at = self.next_timestamp();

        match &self.remote {
            Some(remote) => {
                let record = NewRecord {
                    partition,
                    created_at,
                    fields: Record::<P>::payload_fields(&payload)?,
                };
                remote.put(&self.collection, record).await
            }
            None => {
                let record = Record {
                    id: RecordId::local(),
                    partition,
                    created_at,
                    payload,
                };
                let id = record.id.clone();
                self.commit_local(|mirror| {
                    mirror.insert(record.id.clone(), record);
                })?;
                Ok(id)
            }
        }
    }

    /// Delete a record. Deleting an id that is already gone succeeds.
    pub async fn delete(&mut self, id: &RecordId) -> ShiftboardResult<()> {
        match &self.remote {
            Some(remote) => remote.delete(&self.collection, id).await,
            None => {
                if !self.mirror.contains_key(id) {
                    return Ok(());
                }
                self.commit_local(|mirror| {
                    mirror.remove(id);
                })
            }
        }
    }

    /// Delete every record in the active partition.
    pub async fn clear_partition(&mut self) -> ShiftboardResult<()> {
        let partition = self.active_partition()?;
        match &self.remote {
            Some(remote) => remote.clear_partition(&self.collection, &partition).await,
            None => {
                if self.mirror.is_empty() {
                    return Ok(());
                }
                self.commit_local(|mirror| mirror.clear())
            }
        }
    }

    /// Switch a local-only controller to the remote store for good.
    ///
    /// The current mirror becomes the entire remote content of the active
    /// partition, replacing whatever was there, and then a live feed starts.
    /// If the upload fails the controller stays local.
    pub async fn share(&mut self, remote: R) -> ShiftboardResult<()> {
        self.upload_to(&remote).await?;
        self.go_live(remote)
    }

    /// First half of [`share`](Self::share): replace the remote content of the
    /// active partition with the mirror. The controller stays local, so a
    /// failed or partial upload can simply be repeated.
    pub async fn upload_to(&self, remote: &R) -> ShiftboardResult<usize> {
        self.ensure_local()?;
        let partition = self.active_partition()?;
        let records = self.stored_records()?;
        let count = records.len();

        remote
            .replace_partition(&self.collection, &partition, records)
            .await?;
        tracing::info!(
            collection = %self.collection.name,
            %partition,
            records = count,
            "uploaded local state to the remote store"
        );
        Ok(count)
    }

    /// Second half of [`share`](Self::share): bind to `remote` and follow
    /// its feed for the active partition.
    pub fn go_live(&mut self, remote: R) -> ShiftboardResult<()> {
        self.ensure_local()?;
        let partition = self.active_partition()?;

        self.generation += 1;
        self.ready = false;
        self.degraded = false;
        let sink = SnapshotSink::new(self.generation, self.tx.clone());
        self.subscription = Some(remote.subscribe(&self.collection, &partition, sink));
        self.remote = Some(remote);
        tracing::info!(collection = %self.collection.name, %partition, "following the remote store");
        Ok(())
    }

    fn ensure_local(&self) -> ShiftboardResult<()> {
        if self.remote.is_some() {
            return Err(ShiftboardError::InvalidInput(format!(
                "{} is already shared",
                self.collection.name
            )));
        }
        Ok(())
    }

    fn active_partition(&self) -> ShiftboardResult<PartitionKey> {
        self.partition
            .clone()
            .ok_or_else(|| ShiftboardError::InvalidInput("no partition is active".into()))
    }

    /// Client-side creation time, strictly increasing per controller.
    fn next_timestamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_created_at = now.max(self.last_created_at + 1);
        self.last_created_at
    }

    /// Persist a changed copy of the mirror, then adopt it. The mirror is left
    /// untouched if the cache write fails.
    fn commit_local(
        &mut self,
        change: impl FnOnce(&mut HashMap<RecordId, Record<P>>),
    ) -> ShiftboardResult<()> {
        let partition = self.active_partition()?;
        let mut next = self.mirror.clone();
        change(&mut next);

        let stored = next
            .values()
            .map(Record::to_stored)
            .collect::<ShiftboardResult<Vec<_>>>()?;
        self.cache.save(&self.collection.name, &partition, &stored)?;

        self.mirror = next;
        self.rebuild_order();
        self.notify(Origin::Local);
        Ok(())
    }

    fn replace_mirror(&mut self, stored: Vec<StoredRecord>) {
        let Some(partition) = self.partition.as_ref() else {
            return;
        };

        let mut mirror = HashMap::with_capacity(stored.len());
        for raw in &stored {
            match Record::<P>::from_stored(raw) {
                Ok(record) if &record.partition == partition => {
                    mirror.insert(record.id.clone(), record);
                }
                Ok(record) => tracing::warn!(
                    id = %record.id,
                    expected = %partition,
                    found = %record.partition,
                    "dropping record from another partition"
                ),
                Err(e) => tracing::warn!(id = %raw.id, "dropping invalid record: {e}"),
            }
        }
        tracing::debug!(
            collection = %self.collection.name,
            records = mirror.len(),
            "mirror replaced"
        );

        self.mirror = mirror;
        self.rebuild_order();
    }

    fn rebuild_order(&mut self) {
        let mut ordered: Vec<Record<P>> = self.mirror.values().cloned().collect();
        ordered.sort_by(compare);
        self.ordered = ordered;
    }

    fn stored_records(&self) -> ShiftboardResult<Vec<StoredRecord>> {
        self.ordered.iter().map(Record::to_stored).collect()
    }

    /// Write the mirror to the cache; failures only get logged.
    fn persist_quietly(&self, partition: &PartitionKey) {
        let result = self
            .stored_records()
            .and_then(|stored| self.cache.save(&self.collection.name, partition, &stored));
        if let Err(e) = result {
            tracing::warn!(
                collection = %self.collection.name,
                %partition,
                "could not update local cache: {e}"
            );
        }
    }

    fn notify(&mut self, origin: Origin) {
        let Some(partition) = &self.partition else {
            return;
        };
        let view = View {
            partition,
            records: &self.ordered,
            origin,
        };
        for listener in &mut self.listeners {
            listener(&view);
        }
    }
}

impl<P: Mutable, R: RemoteStore> SyncController<P, R> {
    /// Change a record in place.
    pub async fn update(&mut self, id: &RecordId, patch: P::Patch) -> ShiftboardResult<()> {
        // Reject patches that would make a known record invalid before sending.
        let patched = self.mirror.get(id).map(|existing| {
            let mut record = existing.clone();
            record.payload.apply(&patch);
            record
        });
        if let Some(record) = &patched {
            record.payload.validate()?;
        }

        match &self.remote {
            Some(remote) => {
                let fields = match serde_json::to_value(&patch)? {
                    Value::Object(fields) => fields,
                    other => {
                        return Err(ShiftboardError::Serialization(format!(
                            "patch serialized to {other}, expected an object"
                        )));
                    }
                };
                remote.update(&self.collection, id, fields).await
            }
            None => {
                let record = patched.ok_or_else(|| ShiftboardError::NotFound(id.to_string()))?;
                self.commit_local(|mirror| {
                    mirror.insert(record.id.clone(), record);
                })
            }
        }
    }
}

impl<P: Payload, R: RemoteStore> Drop for SyncController<P, R> {
    fn drop(&mut self) {
        if let Some(partition) = self.partition.clone() {
            if self.ready && !self.degraded {
                self.persist_quietly(&partition);
            }
        }
    }
}
