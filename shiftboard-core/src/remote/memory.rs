//! In-process realtime store.
//!
//! Behaves like the hosted database from the controller's point of view:
//! store-assigned ids, partition-filtered live feeds, writes observed in a
//! single order. Clones share state, so several controllers can watch the
//! same data.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;

use super::{RemoteStore, SnapshotSink, Subscription};
use crate::constants::CREATED_AT_FIELD;
use crate::error::{ShiftboardError, ShiftboardResult};
use crate::partition::PartitionKey;
use crate::record::{Collection, Fields, NewRecord, RecordId, StoredRecord};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    online: bool,
    collections: HashMap<String, BTreeMap<RecordId, Fields>>,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            online: true,
            collections: HashMap::new(),
            listeners: HashMap::new(),
            next_listener: 0,
        }
    }
}

struct Listener {
    collection: Collection,
    partition: PartitionKey,
    sink: SnapshotSink,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate losing or regaining the connection.
    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
    }

    /// Number of live feeds.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Every record in a collection, across partitions.
    pub fn records(&self, collection: &str) -> Vec<StoredRecord> {
        self.lock()
            .collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(id, fields)| StoredRecord {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Inner {
    fn check_online(&self) -> ShiftboardResult<()> {
        if self.online {
            Ok(())
        } else {
            Err(ShiftboardError::StoreUnavailable("store is offline".into()))
        }
    }

    fn snapshot(&self, collection: &Collection, partition: &PartitionKey) -> Vec<StoredRecord> {
        let Some(records) = self.collections.get(&collection.name) else {
            return Vec::new();
        };
        records
            .iter()
            .filter(|(_, fields)| in_partition(fields, collection, partition))
            .map(|(id, fields)| StoredRecord {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect()
    }

    /// Push a fresh snapshot to every feed watching the partition.
    fn publish(&mut self, collection: &Collection, partition: &PartitionKey) {
        let snapshot = self.snapshot(collection, partition);
        self.listeners.retain(|_, listener| {
            if listener.collection.name != collection.name || &listener.partition != partition {
                return true;
            }
            listener.sink.snapshot(snapshot.clone())
        });
    }

    fn partition_of(&self, collection: &Collection, id: &RecordId) -> Option<PartitionKey> {
        self.collections
            .get(&collection.name)?
            .get(id)?
            .get(collection.partition_field)
            .and_then(Value::as_str)
            .map(PartitionKey::from_stored)
    }
}

fn in_partition(fields: &Fields, collection: &Collection, partition: &PartitionKey) -> bool {
    fields.get(collection.partition_field).and_then(Value::as_str) == Some(partition.as_str())
}

impl RemoteStore for MemoryStore {
    async fn put(&self, collection: &Collection, record: NewRecord) -> ShiftboardResult<RecordId> {
        let mut inner = self.lock();
        inner.check_online()?;

        let id = RecordId::new(uuid::Uuid::new_v4().simple().to_string());
        let mut fields = record.fields;
        fields.insert(
            collection.partition_field.to_string(),
            Value::String(record.partition.to_string()),
        );
        fields.insert(CREATED_AT_FIELD.to_string(), Value::from(record.created_at));

        inner
            .collections
            .entry(collection.name.clone())
            .or_default()
            .insert(id.clone(), fields);
        inner.publish(collection, &record.partition);

        Ok(id)
    }

    async fn update(
        &self,
        collection: &Collection,
        id: &RecordId,
        patch: Fields,
    ) -> ShiftboardResult<()> {
        let mut inner = self.lock();
        inner.check_online()?;

        let partition = inner
            .partition_of(collection, id)
            .ok_or_else(|| ShiftboardError::NotFound(id.to_string()))?;

        if let Some(fields) = inner
            .collections
            .get_mut(&collection.name)
            .and_then(|records| records.get_mut(id))
        {
            for (key, value) in patch {
                if key == collection.partition_field || key == CREATED_AT_FIELD {
                    continue;
                }
                fields.insert(key, value);
            }
        }
        inner.publish(collection, &partition);

        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &RecordId) -> ShiftboardResult<()> {
        let mut inner = self.lock();
        inner.check_online()?;

        let Some(partition) = inner.partition_of(collection, id) else {
            return Ok(());
        };
        if let Some(records) = inner.collections.get_mut(&collection.name) {
            records.remove(id);
        }
        inner.publish(collection, &partition);

        Ok(())
    }

    async fn clear_partition(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
    ) -> ShiftboardResult<()> {
        let mut inner = self.lock();
        inner.check_online()?;

        let removed = match inner.collections.get_mut(&collection.name) {
            Some(records) => {
                let before = records.len();
                records.retain(|_, fields| !in_partition(fields, collection, partition));
                before - records.len()
            }
            None => 0,
        };
        if removed > 0 {
            inner.publish(collection, partition);
        }

        Ok(())
    }

    async fn replace_partition(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
        records: Vec<StoredRecord>,
    ) -> ShiftboardResult<()> {
        let mut inner = self.lock();
        inner.check_online()?;

        let stored = inner
            .collections
            .entry(collection.name.clone())
            .or_default();
        stored.retain(|_, fields| !in_partition(fields, collection, partition));
        for record in records {
            let mut fields = record.fields;
            fields.insert(
                collection.partition_field.to_string(),
                Value::String(partition.to_string()),
            );
            stored.insert(record.id, fields);
        }
        inner.publish(collection, partition);

        Ok(())
    }

    fn subscribe(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
        sink: SnapshotSink,
    ) -> Subscription {
        let mut inner = self.lock();

        if inner.check_online().is_err() {
            sink.unavailable("store is offline");
            return Subscription::inert();
        }

        sink.snapshot(inner.snapshot(collection, partition));

        let key = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.insert(
            key,
            Listener {
                collection: collection.clone(),
                partition: partition.clone(),
                sink,
            },
        );

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&key);
            }
        })
    }
}
